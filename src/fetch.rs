//! Single-symbol fetch with caching and credential rotation

use crate::core::config::FetchConfig;
use crate::core::{
    CacheKey, ChartPayload, CredentialRotator, FetchError, Interval, QuoteCache, Range, Symbol,
};
use crate::providers::util::with_rotation;
use crate::providers::{ChartRequest, ChartSource};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Fetches chart payloads for one symbol at a time.
///
/// The cache and credential pool are owned by whoever builds the executor and are
/// shared with it; both are written only on the success path.
pub struct FetchExecutor {
    source: Arc<dyn ChartSource>,
    cache: Arc<QuoteCache>,
    credentials: Arc<CredentialRotator>,
    config: FetchConfig,
}

impl FetchExecutor {
    pub fn new(
        source: Arc<dyn ChartSource>,
        cache: Arc<QuoteCache>,
        credentials: Arc<CredentialRotator>,
        config: FetchConfig,
    ) -> Self {
        Self {
            source,
            cache,
            credentials,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<QuoteCache> {
        &self.cache
    }

    pub fn credentials(&self) -> &Arc<CredentialRotator> {
        &self.credentials
    }

    #[instrument(name = "FetchSeries", skip(self), fields(symbol = %symbol))]
    pub async fn fetch_series(
        &self,
        symbol: &Symbol,
        range: Range,
        interval: Interval,
    ) -> Result<Arc<ChartPayload>, FetchError> {
        let key = CacheKey::new(symbol, range, interval);
        if let Some(entry) = self.cache.get(&key) {
            return Ok(entry.payload);
        }

        let Some((start, _)) = self.credentials.current() else {
            warn!("No credentials available, skipping fetch");
            return Err(FetchError::NoCredentials);
        };

        let request = ChartRequest::new(symbol.clone(), range, interval);
        let pool_size = self.credentials.len();
        let budget = self.config.retry_budget(pool_size);
        let source = &self.source;
        let credentials = &self.credentials;
        let request_ref = &request;

        let outcome = with_rotation(
            move |index| {
                let credential = credentials.get(index).unwrap_or_default();
                source.fetch_chart(request_ref, credential)
            },
            start,
            pool_size,
            budget,
            self.config.backoff(),
        )
        .await;

        match outcome {
            Ok((index, payload)) => {
                let payload = Arc::new(payload);
                self.cache.put(key, Arc::clone(&payload));
                self.credentials.mark_working(index);
                debug!(credential = index, "Fetched {}", symbol);
                Ok(payload)
            }
            Err(failure) => {
                warn!(
                    attempts = failure.attempts,
                    "Giving up on {}: {}", symbol, failure.last
                );
                if failure.last.is_retryable() {
                    Err(FetchError::QuotaExhausted {
                        symbol: symbol.to_string(),
                        attempts: failure.attempts,
                        last: Box::new(failure.last),
                    })
                } else {
                    Err(failure.last)
                }
            }
        }
    }

    /// Drops cached payloads so the next fetch for these symbols goes to the provider.
    pub fn invalidate(&self, symbols: &[Symbol], range: Range, interval: Interval) {
        for symbol in symbols {
            self.cache.invalidate(&CacheKey::new(symbol, range, interval));
        }
    }
}
