//! Performance chart data for a portfolio view

use crate::batch::{BatchOrchestrator, BatchResult, BatchStatus};
use crate::core::config::{AppConfig, FetchConfig, Investment};
use crate::core::{CredentialRotator, FetchError, QuoteCache, Selection, Symbol};
use crate::fetch::FetchExecutor;
use crate::normalize::{NormalizedSeries, normalize};
use crate::providers::ChartSource;
use crate::providers::yahoo_finance::YahooChartSource;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a view needs to draw one batch.
#[derive(Debug, Clone)]
pub struct ChartReport {
    pub selection: Selection,
    pub status: BatchStatus,
    /// Series for the symbols that loaded, in request order.
    pub series: Vec<NormalizedSeries>,
    pub failures: Vec<(Symbol, FetchError)>,
    /// Set when some but not all symbols failed.
    pub warning: Option<String>,
    /// Set when at least one symbol loaded.
    pub last_updated: Option<DateTime<Utc>>,
}

impl ChartReport {
    pub fn from_batch(batch: &BatchResult, selection: Selection) -> Self {
        let series: Vec<NormalizedSeries> = batch
            .successes()
            .map(|(symbol, payload)| normalize(symbol, payload, selection.range()))
            .collect();
        let failures = batch
            .failures()
            .map(|(symbol, e)| (symbol.clone(), e.clone()))
            .collect();
        let last_updated = (!series.is_empty()).then_some(batch.completed_at);

        ChartReport {
            selection,
            status: batch.status.clone(),
            series,
            failures,
            warning: batch.warning(),
            last_updated,
        }
    }

    /// Page-level error, only for a batch where nothing loaded.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            BatchStatus::TotalFailure { message } => Some(message),
            _ => None,
        }
    }
}

/// Owns the session's quote cache and credential pool and serves chart reports.
pub struct ChartService {
    orchestrator: BatchOrchestrator,
}

impl ChartService {
    pub fn new(source: Arc<dyn ChartSource>, credentials: Vec<String>, config: FetchConfig) -> Self {
        let cache = Arc::new(QuoteCache::new(config.ttl()));
        let credentials = Arc::new(CredentialRotator::new(credentials));
        let executor = FetchExecutor::new(source, cache, credentials, config);
        ChartService {
            orchestrator: BatchOrchestrator::new(Arc::new(executor)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let rapidapi = config
            .providers
            .rapidapi
            .clone()
            .unwrap_or_default();
        let credentials = rapidapi.resolve_credentials();
        info!(
            credentials = credentials.len(),
            "Using quote provider at {}", rapidapi.base_url
        );

        let source = YahooChartSource::new(&rapidapi.base_url, &rapidapi.host, config.fetch.timeout())
            .context("Failed to create chart source")?;
        Ok(Self::new(Arc::new(source), credentials, config.fetch.clone()))
    }

    pub fn executor(&self) -> &Arc<FetchExecutor> {
        self.orchestrator.executor()
    }

    /// Loads charts, serving fresh cache entries without touching the provider.
    pub async fn load(&self, symbols: &[Symbol], selection: Selection) -> ChartReport {
        let batch = self
            .orchestrator
            .fetch_all(symbols, selection.range(), selection.interval())
            .await;
        ChartReport::from_batch(&batch, selection)
    }

    /// Drops cached entries for this selection, then loads again.
    pub async fn refresh(&self, symbols: &[Symbol], selection: Selection) -> ChartReport {
        debug!("Invalidating {} cached series", symbols.len());
        self.executor()
            .invalidate(symbols, selection.range(), selection.interval());
        self.load(symbols, selection).await
    }
}

/// Picks the symbols with the largest cost basis, summed across portfolios.
///
/// Positions without a known cost basis count as zero; ties keep file order. A `limit`
/// of zero keeps every symbol.
pub fn select_top_symbols<'a, I>(investments: I, limit: usize) -> Vec<Symbol>
where
    I: IntoIterator<Item = &'a Investment>,
{
    let mut order: Vec<Symbol> = Vec::new();
    let mut cost: HashMap<Symbol, f64> = HashMap::new();
    for investment in investments {
        let basis = investment.cost_basis().unwrap_or(0.0);
        match cost.get_mut(&investment.symbol) {
            Some(total) => *total += basis,
            None => {
                order.push(investment.symbol.clone());
                cost.insert(investment.symbol.clone(), basis);
            }
        }
    }

    let weight = |s: &Symbol| cost.get(s).copied().unwrap_or(0.0);
    order.sort_by(|a, b| weight(b).total_cmp(&weight(a)));
    if limit > 0 {
        order.truncate(limit);
    }
    order
}

/// Invested amount and market value for the holdings quoted in one currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyTotals {
    pub currency: String,
    pub invested: f64,
    pub current_value: f64,
}

impl CurrencyTotals {
    pub fn profit_loss(&self) -> f64 {
        self.current_value - self.invested
    }

    pub fn profit_loss_pct(&self) -> Option<f64> {
        (self.invested > 0.0).then(|| self.profit_loss() / self.invested * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performer {
    pub symbol: Symbol,
    /// Move of the latest close against the average buy price.
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PortfolioSummary {
    /// One entry per quote currency, in order of first appearance.
    pub totals: Vec<CurrencyTotals>,
    pub best: Option<Performer>,
    pub worst: Option<Performer>,
    /// Charted symbols with no units or buy price; left out of the totals.
    pub without_cost_basis: Vec<Symbol>,
    /// Symbols whose latest close is unknown; valued at cost and not ranked.
    pub unpriced: Vec<Symbol>,
}

impl PortfolioSummary {
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Summarizes the charted holdings against their latest closes.
///
/// Positions are merged per symbol using only lots with a known cost basis.
pub fn summarize<'a, I>(
    investments: I,
    symbols: &[Symbol],
    series: &[NormalizedSeries],
) -> PortfolioSummary
where
    I: IntoIterator<Item = &'a Investment>,
{
    let mut positions: HashMap<&Symbol, (f64, f64)> = HashMap::new();
    for investment in investments {
        let (Some(units), Some(cost)) = (investment.units, investment.cost_basis()) else {
            continue;
        };
        let position = positions.entry(&investment.symbol).or_insert((0.0, 0.0));
        position.0 += units;
        position.1 += cost;
    }

    let mut summary = PortfolioSummary::default();
    let mut performers: Vec<Performer> = Vec::new();
    for symbol in symbols {
        let Some(&(units, cost)) = positions.get(symbol).filter(|(units, _)| *units > 0.0) else {
            summary.without_cost_basis.push(symbol.clone());
            continue;
        };
        let loaded = series.iter().find(|s| &s.symbol == symbol);
        let currency = loaded
            .map(|s| s.currency.clone())
            .unwrap_or_else(|| symbol.market().currency().to_string());
        let last_close = loaded.and_then(|s| s.last_value()).map(|(_, v)| v);

        let current_value = match last_close {
            Some(close) => {
                let avg_price = cost / units;
                if avg_price > 0.0 {
                    performers.push(Performer {
                        symbol: symbol.clone(),
                        change_pct: (close - avg_price) / avg_price * 100.0,
                    });
                }
                units * close
            }
            None => {
                summary.unpriced.push(symbol.clone());
                cost
            }
        };

        match summary.totals.iter_mut().find(|t| t.currency == currency) {
            Some(totals) => {
                totals.invested += cost;
                totals.current_value += current_value;
            }
            None => summary.totals.push(CurrencyTotals {
                currency,
                invested: cost,
                current_value,
            }),
        }
    }

    // Ties keep the earlier symbol for both ends.
    summary.best = performers
        .iter()
        .rev()
        .max_by(|a, b| a.change_pct.total_cmp(&b.change_pct))
        .cloned();
    summary.worst = performers
        .iter()
        .min_by(|a, b| a.change_pct.total_cmp(&b.change_pct))
        .cloned();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Interval, Range};
    use crate::fetch::tests::MockChartSource;

    fn service(source: Arc<MockChartSource>) -> ChartService {
        ChartService::new(
            source,
            vec!["k0".to_string()],
            FetchConfig {
                backoff_ms: 0,
                ..FetchConfig::default()
            },
        )
    }

    fn symbols(names: &[&str]) -> Vec<Symbol> {
        names.iter().map(|s| Symbol::from(*s)).collect()
    }

    fn investment(symbol: &str, units: Option<f64>, buy_price: Option<f64>) -> Investment {
        Investment {
            symbol: Symbol::from(symbol),
            units,
            buy_price,
        }
    }

    #[tokio::test]
    async fn test_partial_report_has_series_for_successes_only() {
        let source = Arc::new(MockChartSource::new().failing_symbols(&["MSFT"]));
        let service = service(source);

        let report = service
            .load(&symbols(&["AAPL", "MSFT", "GOOG"]), Selection::default())
            .await;

        let charted: Vec<&str> = report.series.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(charted, vec!["AAPL", "GOOG"]);
        assert_eq!(report.series[0].label, "AAPL - AAPL Corp");
        assert_eq!(report.series[0].len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0.as_str(), "MSFT");
        assert_eq!(
            report.warning.as_deref(),
            Some("Partial data loaded. 1 of 3 symbols failed: MSFT")
        );
        assert!(report.last_updated.is_some());
        assert_eq!(report.error(), None);
    }

    #[tokio::test]
    async fn test_total_failure_report() {
        let source = Arc::new(MockChartSource::new().failing_credentials(&["k0"]));
        let service = service(source);

        let report = service
            .load(&symbols(&["AAPL"]), Selection::default())
            .await;

        assert!(report.series.is_empty());
        assert!(report.last_updated.is_none());
        assert!(report.warning.is_none());
        assert!(report.error().unwrap().contains("AAPL: Gave up on AAPL after 2 attempts"));
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let source = Arc::new(MockChartSource::new());
        let service = service(Arc::clone(&source));
        let selection = Selection::new(Range::FiveDays, Some(Interval::OneHour)).unwrap();
        let input = symbols(&["AAPL", "MSFT"]);

        service.load(&input, selection).await;
        service.load(&input, selection).await;
        assert_eq!(source.calls(), 2);

        let report = service.refresh(&input, selection).await;
        assert_eq!(source.calls(), 4);
        assert_eq!(report.status, BatchStatus::FullSuccess);

        // other selections are untouched by the refresh
        let other = Selection::default();
        service.load(&input, other).await;
        assert_eq!(source.calls(), 6);
        service.refresh(&input, selection).await;
        service.load(&input, other).await;
        assert_eq!(source.calls(), 8);
    }

    #[tokio::test]
    async fn test_empty_portfolio_report() {
        let source = Arc::new(MockChartSource::new());
        let service = service(Arc::clone(&source));

        let report = service.load(&[], Selection::default()).await;
        assert_eq!(report.status, BatchStatus::Empty);
        assert!(report.error().is_none());
        assert_eq!(source.calls(), 0);
    }

    fn series(symbol: &str, currency: &str, closes: &[Option<f64>]) -> NormalizedSeries {
        NormalizedSeries {
            symbol: Symbol::from(symbol),
            label: symbol.to_string(),
            currency: currency.to_string(),
            points: closes
                .iter()
                .enumerate()
                .map(|(i, value)| crate::normalize::SeriesPoint {
                    timestamp: i as i64,
                    label: i.to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_summarize_totals_and_performers() {
        let investments = vec![
            investment("AAPL", Some(10.0), Some(100.0)),
            investment("AAPL", Some(10.0), Some(200.0)),
            investment("MSFT", Some(5.0), Some(400.0)),
            investment("RELIANCE.NS", Some(2.0), Some(2000.0)),
        ];
        let symbols = symbols(&["AAPL", "MSFT", "RELIANCE.NS"]);
        let loaded = vec![
            series("AAPL", "USD", &[Some(140.0), Some(180.0), None]),
            series("MSFT", "USD", &[Some(380.0)]),
            series("RELIANCE.NS", "INR", &[Some(2500.0)]),
        ];

        let summary = summarize(&investments, &symbols, &loaded);

        assert_eq!(summary.totals.len(), 2);
        let usd = &summary.totals[0];
        assert_eq!(usd.currency, "USD");
        assert_eq!(usd.invested, 5000.0);
        // 20 * 180 + 5 * 380
        assert_eq!(usd.current_value, 5500.0);
        assert_eq!(usd.profit_loss(), 500.0);
        assert!((usd.profit_loss_pct().unwrap() - 10.0).abs() < 1e-9);

        let inr = &summary.totals[1];
        assert_eq!(inr.currency, "INR");
        assert_eq!(inr.profit_loss(), 1000.0);

        // AAPL +20% on an average price of 150, MSFT -5%, RELIANCE +25%
        let best = summary.best.unwrap();
        assert_eq!(best.symbol.as_str(), "RELIANCE.NS");
        assert!((best.change_pct - 25.0).abs() < 1e-9);
        assert_eq!(summary.worst.unwrap().symbol.as_str(), "MSFT");
        assert!(summary.without_cost_basis.is_empty());
        assert!(summary.unpriced.is_empty());
    }

    #[test]
    fn test_summarize_missing_cost_basis_and_failed_symbols() {
        let investments = vec![
            investment("AAPL", Some(10.0), Some(100.0)),
            investment("MSFT", Some(5.0), Some(400.0)),
            investment("TSLA", None, Some(200.0)),
            investment("GOOG", Some(3.0), None),
        ];
        let symbols = symbols(&["MSFT", "AAPL", "TSLA", "GOOG"]);
        // MSFT failed to load
        let loaded = vec![series("AAPL", "USD", &[Some(110.0)])];

        let summary = summarize(&investments, &symbols, &loaded);

        assert_eq!(summary.without_cost_basis, symbols[2..].to_vec());
        assert_eq!(summary.unpriced, vec![Symbol::from("MSFT")]);
        assert_eq!(
            summary.totals,
            vec![CurrencyTotals {
                currency: "USD".to_string(),
                invested: 3000.0,
                current_value: 3100.0,
            }]
        );
        // Only priced holdings are ranked
        assert_eq!(summary.best, summary.worst);
        assert_eq!(summary.best.unwrap().symbol.as_str(), "AAPL");
    }

    #[test]
    fn test_summarize_nothing_to_value() {
        let summary = summarize(&Vec::<Investment>::new(), &symbols(&["AAPL"]), &[]);
        assert!(summary.is_empty());
        assert_eq!(summary.without_cost_basis, symbols(&["AAPL"]));
        assert!(summary.best.is_none());

        let empty = summarize(&Vec::<Investment>::new(), &[], &[]);
        assert_eq!(empty, PortfolioSummary::default());
    }

    #[test]
    fn test_select_top_symbols() {
        let investments = vec![
            investment("AAPL", Some(10.0), Some(150.0)),
            investment("MSFT", Some(5.0), Some(400.0)),
            investment("RELIANCE.NS", None, None),
            investment("AAPL", Some(10.0), Some(150.0)),
            investment("GOOG", Some(1.0), Some(100.0)),
            investment("TSLA", None, Some(200.0)),
        ];

        assert_eq!(
            select_top_symbols(&investments, 3),
            symbols(&["AAPL", "MSFT", "GOOG"])
        );
        assert_eq!(
            select_top_symbols(&investments, 0),
            symbols(&["AAPL", "MSFT", "GOOG", "RELIANCE.NS", "TSLA"])
        );
        assert!(select_top_symbols(&Vec::<Investment>::new(), 5).is_empty());
    }
}
