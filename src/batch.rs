//! Concurrent fan-out of chart fetches with partial-failure reporting

use crate::core::{ChartPayload, FetchError, Interval, Range, Symbol};
use crate::fetch::FetchExecutor;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(Arc<ChartPayload>),
    Failure(FetchError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

impl From<Result<Arc<ChartPayload>, FetchError>> for FetchOutcome {
    fn from(result: Result<Arc<ChartPayload>, FetchError>) -> Self {
        match result {
            Ok(payload) => FetchOutcome::Success(payload),
            Err(e) => FetchOutcome::Failure(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: Symbol,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    /// Nothing was requested.
    Empty,
    FullSuccess,
    PartialSuccess { failed: Vec<Symbol> },
    /// Every symbol failed; `message` lists each symbol with its cause.
    TotalFailure { message: String },
}

/// Classifies a finished batch. Independent of how the outcomes were produced.
pub fn classify(outcomes: &[SymbolOutcome]) -> BatchStatus {
    if outcomes.is_empty() {
        return BatchStatus::Empty;
    }

    let failed: Vec<&SymbolOutcome> = outcomes
        .iter()
        .filter(|o| !o.outcome.is_success())
        .collect();
    if failed.is_empty() {
        BatchStatus::FullSuccess
    } else if failed.len() == outcomes.len() {
        let causes: Vec<String> = failed
            .iter()
            .map(|o| match &o.outcome {
                FetchOutcome::Failure(e) => format!("{}: {}", o.symbol, e),
                FetchOutcome::Success(_) => o.symbol.to_string(),
            })
            .collect();
        BatchStatus::TotalFailure {
            message: format!("No data could be loaded. {}", causes.join("; ")),
        }
    } else {
        BatchStatus::PartialSuccess {
            failed: failed.iter().map(|o| o.symbol.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub range: Range,
    pub interval: Interval,
    /// One entry per requested symbol, in request order.
    pub outcomes: Vec<SymbolOutcome>,
    pub status: BatchStatus,
    pub completed_at: DateTime<Utc>,
}

impl BatchResult {
    pub fn new(range: Range, interval: Interval, outcomes: Vec<SymbolOutcome>) -> Self {
        let status = classify(&outcomes);
        Self {
            range,
            interval,
            outcomes,
            status,
            completed_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&Symbol, &Arc<ChartPayload>)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            FetchOutcome::Success(payload) => Some((&o.symbol, payload)),
            FetchOutcome::Failure(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Symbol, &FetchError)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            FetchOutcome::Failure(e) => Some((&o.symbol, e)),
            FetchOutcome::Success(_) => None,
        })
    }

    /// Non-blocking warning for a partially loaded batch.
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            BatchStatus::PartialSuccess { failed } => {
                let names: Vec<&str> = failed.iter().map(Symbol::as_str).collect();
                Some(format!(
                    "Partial data loaded. {} of {} symbols failed: {}",
                    failed.len(),
                    self.outcomes.len(),
                    names.join(", ")
                ))
            }
            _ => None,
        }
    }
}

pub struct BatchOrchestrator {
    executor: Arc<FetchExecutor>,
}

impl BatchOrchestrator {
    pub fn new(executor: Arc<FetchExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<FetchExecutor> {
        &self.executor
    }

    /// Fetches every symbol concurrently on the calling task and waits for all of them;
    /// one symbol failing never cancels the others.
    #[instrument(name = "FetchBatch", skip(self, symbols), fields(count = symbols.len()))]
    pub async fn fetch_all(
        &self,
        symbols: &[Symbol],
        range: Range,
        interval: Interval,
    ) -> BatchResult {
        if symbols.is_empty() {
            return BatchResult::new(range, interval, Vec::new());
        }

        let fetches = symbols.iter().map(|symbol| async move {
            let result = self.executor.fetch_series(symbol, range, interval).await;
            SymbolOutcome {
                symbol: symbol.clone(),
                outcome: result.into(),
            }
        });
        let outcomes = join_all(fetches).await;
        let batch = BatchResult::new(range, interval, outcomes);

        match &batch.status {
            BatchStatus::TotalFailure { message } => warn!("{}", message),
            BatchStatus::PartialSuccess { failed } => {
                warn!(failed = failed.len(), "Partial batch for {} @ {}", range, interval)
            }
            _ => {}
        }
        info!(
            succeeded = batch.success_count(),
            failed = batch.failure_count(),
            cache_writes = self.executor.cache().writes(),
            "Batch finished"
        );
        batch
    }
}
