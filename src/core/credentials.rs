//! Round-robin pool of provider access keys

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Ordered credential list plus a cursor at the last key known to have quota.
///
/// The cursor is shared by every fetch of a session. Concurrent fetches may race on
/// it; the last successful writer wins, which is good enough to steer the next fetch
/// towards a working key.
pub struct CredentialRotator {
    credentials: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialRotator {
    pub fn new(credentials: Vec<String>) -> Self {
        Self {
            credentials,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.credentials.get(index).map(String::as_str)
    }

    /// The key at the cursor, or `None` for an empty pool.
    pub fn current(&self) -> Option<(usize, &str)> {
        let index = self.cursor();
        self.get(index).map(|credential| (index, credential))
    }

    /// Index after `index`, wrapping around the pool.
    pub fn next(&self, index: usize) -> usize {
        if self.credentials.is_empty() {
            0
        } else {
            (index + 1) % self.credentials.len()
        }
    }

    /// Records that the key at `index` just served a request successfully.
    pub fn mark_working(&self, index: usize) {
        if self.credentials.is_empty() {
            return;
        }
        let index = index % self.credentials.len();
        let previous = self.cursor.swap(index, Ordering::Relaxed);
        if previous != index {
            debug!(from = previous, to = index, "Switched active credential");
        }
    }
}

// Keys never end up in logs.
impl fmt::Debug for CredentialRotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRotator")
            .field("credentials", &self.credentials.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}
