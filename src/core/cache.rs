//! Session-lifetime cache of chart payloads keyed by (symbol, range, interval)

use super::payload::ChartPayload;
use super::selection::{Interval, Range};
use super::symbol::Symbol;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(symbol: &Symbol, range: Range, interval: Interval) -> Self {
        CacheKey(format!("{symbol}-{range}-{interval}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable once written; a later `put` replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Arc<ChartPayload>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Expired entries are pruned when looked up and never handed out.
pub struct QuoteCache {
    ttl: Duration,
    inner: Mutex<HashMap<CacheKey, CacheEntry>>,
    writes: AtomicUsize,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Writers never panic while holding the lock, so a poisoned map is still consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.age() < self.ttl => {
                debug!("Cache HIT for key: {}", key);
                Some(entry.clone())
            }
            Some(_) => {
                debug!("Cache entry expired for key: {}", key);
                entries.remove(key);
                None
            }
            None => {
                debug!("Cache MISS for key: {}", key);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, payload: Arc<ChartPayload>) {
        debug!("Cache PUT for key: {}", key);
        let entry = CacheEntry {
            payload,
            fetched_at: Instant::now(),
        };
        self.entries().insert(key, entry);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalidate(&self, key: &CacheKey) {
        if self.entries().remove(key).is_some() {
            debug!("Cache REMOVE for key: {}", key);
        }
    }

    /// Total `put` calls over the cache's lifetime.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of stored entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
