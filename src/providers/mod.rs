pub mod util;
pub mod yahoo_finance;

use crate::core::{ChartPayload, FetchError, Interval, Range, Symbol};
use async_trait::async_trait;

/// One chart request as sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub symbol: Symbol,
    pub range: Range,
    pub interval: Interval,
}

impl ChartRequest {
    pub fn new(symbol: Symbol, range: Range, interval: Interval) -> Self {
        Self {
            symbol,
            range,
            interval,
        }
    }

    pub fn region(&self) -> &'static str {
        self.symbol.market().region()
    }
}

/// A provider that serves chart payloads for a single access credential per call.
#[async_trait]
pub trait ChartSource: Send + Sync {
    async fn fetch_chart(
        &self,
        request: &ChartRequest,
        credential: &str,
    ) -> Result<ChartPayload, FetchError>;
}
