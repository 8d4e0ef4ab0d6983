use super::selection::{Interval, Range, Selection};
use super::symbol::Symbol;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Investment {
    pub symbol: Symbol,
    pub units: Option<f64>,
    pub buy_price: Option<f64>,
}

impl Investment {
    /// Amount paid for the position, when both units and price are known.
    pub fn cost_basis(&self) -> Option<f64> {
        Some(self.units? * self.buy_price?)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Portfolio {
    pub name: String,
    #[serde(default)]
    pub investments: Vec<Investment>,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct RapidApiConfig {
    pub base_url: String,
    pub host: String,
    #[serde(default)]
    pub credentials: Vec<String>,
    /// Names of environment variables holding additional keys.
    #[serde(default)]
    pub credentials_env: Vec<String>,
}

impl RapidApiConfig {
    /// Inline keys first, then keys from `credentials_env` in order. Unset or blank
    /// variables are skipped.
    pub fn resolve_credentials(&self) -> Vec<String> {
        let from_env = self.credentials_env.iter().filter_map(|name| {
            match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
                _ => {
                    warn!("Credential variable {} is not set", name);
                    None
                }
            }
        });
        self.credentials
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .chain(from_env)
            .collect()
    }
}

// Keys never end up in logs.
impl fmt::Debug for RapidApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapidApiConfig")
            .field("base_url", &self.base_url)
            .field("host", &self.host)
            .field("credentials", &self.credentials.len())
            .field("credentials_env", &self.credentials_env)
            .finish()
    }
}

impl Default for RapidApiConfig {
    fn default() -> Self {
        RapidApiConfig {
            base_url: "https://yahoo-finance166.p.rapidapi.com".to_string(),
            host: "yahoo-finance166.p.rapidapi.com".to_string(),
            credentials: Vec::new(),
            credentials_env: vec![
                "RAPIDAPI_KEY_1".to_string(),
                "RAPIDAPI_KEY_2".to_string(),
                "RAPIDAPI_KEY_3".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub rapidapi: Option<RapidApiConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            rapidapi: Some(RapidApiConfig::default()),
        }
    }
}

/// Tuning knobs for the fetch pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// Cache lifetime of a successful response.
    pub ttl_ms: u64,
    /// Attempts per credential before a symbol is given up.
    pub retry_budget_multiplier: usize,
    /// Delay between attempts.
    pub backoff_ms: u64,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl FetchConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total attempts allowed for one symbol against a pool of `pool_size` keys.
    pub fn retry_budget(&self, pool_size: usize) -> usize {
        self.retry_budget_multiplier.max(1) * pool_size
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            ttl_ms: 5 * 60 * 1000,
            retry_budget_multiplier: 2,
            backoff_ms: 500,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChartConfig {
    /// Both unset means 1 Month @ 1 Day. A range without an interval uses the range's
    /// usual interval.
    #[serde(default)]
    pub range: Option<Range>,
    #[serde(default)]
    pub interval: Option<Interval>,
    #[serde(default = "ChartConfig::default_max_symbols")]
    pub max_symbols: usize,
}

impl ChartConfig {
    fn default_max_symbols() -> usize {
        5
    }

    pub fn selection(&self) -> Result<Selection> {
        Selection::resolve(self.range, self.interval).context("Invalid chart selection in config")
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            range: None,
            interval: None,
            max_symbols: Self::default_max_symbols(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub portfolios: Vec<Portfolio>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "foliochart", "foliochart")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Every investment across all portfolios, in file order.
    pub fn investments(&self) -> impl Iterator<Item = &Investment> {
        self.portfolios.iter().flat_map(|p| p.investments.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
portfolios:
  - name: "Tech Stocks"
    investments:
      - symbol: "AAPL"
        units: 10.5
        buy_price: 150.0
      - symbol: "MSFT"
  - name: "India"
    investments:
      - symbol: "RELIANCE.NS"
        units: 4
        buy_price: 2400
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.portfolios.len(), 2);
        assert_eq!(config.portfolios[0].name, "Tech Stocks");
        assert_eq!(config.portfolios[0].investments[0].symbol, Symbol::from("AAPL"));
        assert_eq!(config.portfolios[0].investments[0].cost_basis(), Some(1575.0));
        assert_eq!(config.portfolios[0].investments[1].cost_basis(), None);
        assert_eq!(config.investments().count(), 3);

        let rapidapi = config.providers.rapidapi.expect("default provider");
        assert_eq!(rapidapi.host, "yahoo-finance166.p.rapidapi.com");
        assert_eq!(config.fetch, FetchConfig::default());
        assert_eq!(config.chart, ChartConfig::default());

        let selection = config.chart.selection().unwrap();
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn test_config_with_overrides() {
        let yaml_str = r#"
portfolios: []
providers:
  rapidapi:
    base_url: "http://localhost:9000"
    host: "localhost"
    credentials: ["k1", "  ", "k2"]
fetch:
  ttl_ms: 1000
  backoff_ms: 0
chart:
  range: 1d
  max_symbols: 3
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        let rapidapi = config.providers.rapidapi.unwrap();
        assert_eq!(rapidapi.base_url, "http://localhost:9000");
        assert_eq!(rapidapi.resolve_credentials(), vec!["k1", "k2"]);

        assert_eq!(config.fetch.ttl(), Duration::from_secs(1));
        assert_eq!(config.fetch.backoff(), Duration::ZERO);
        assert_eq!(config.fetch.retry_budget_multiplier, 2);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(5));

        let selection = config.chart.selection().unwrap();
        assert_eq!(selection.range(), Range::OneDay);
        assert_eq!(selection.interval(), Interval::FiveMinutes);
        assert_eq!(config.chart.max_symbols, 3);
    }

    #[test]
    fn test_invalid_chart_selection() {
        let yaml_str = r#"
portfolios: []
chart:
  range: 1d
  interval: 1mo
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.chart.selection().is_err());

        let bad_range = "portfolios: []\nchart:\n  range: 3w\n";
        assert!(serde_yaml::from_str::<AppConfig>(bad_range).is_err());
    }

    #[test]
    fn test_default_selection_with_or_without_chart_section() {
        let without = "portfolios: []\n";
        let partial = "portfolios: []\nchart:\n  max_symbols: 3\n";
        for yaml in [without, partial] {
            let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
            assert_eq!(config.chart.selection().unwrap(), Selection::default(), "{yaml}");
        }

        let range_only = "portfolios: []\nchart:\n  range: 1mo\n";
        let config: AppConfig = serde_yaml::from_str(range_only).unwrap();
        let selection = config.chart.selection().unwrap();
        assert_eq!(selection.range(), Range::OneMonth);
        assert_eq!(selection.interval(), Interval::OneWeek);
    }

    #[test]
    fn test_debug_output_hides_inline_keys() {
        let yaml_str = r#"
portfolios: []
providers:
  rapidapi:
    base_url: "http://localhost:9000"
    host: "localhost"
    credentials: ["super-secret-key", "another-secret"]
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        let rendered = format!("{config:#?}");
        assert!(!rendered.contains("super-secret-key"));
        assert!(!rendered.contains("another-secret"));
        assert!(rendered.contains("credentials: 2"));
        assert!(rendered.contains("http://localhost:9000"));
    }

    #[test]
    fn test_credentials_from_env() {
        // Variable names are unique to this test.
        unsafe {
            std::env::set_var("FOLIOCHART_TEST_KEY_A", "env-key");
            std::env::set_var("FOLIOCHART_TEST_KEY_BLANK", " ");
        }
        let rapidapi = RapidApiConfig {
            credentials: vec!["inline".to_string()],
            credentials_env: vec![
                "FOLIOCHART_TEST_KEY_A".to_string(),
                "FOLIOCHART_TEST_KEY_BLANK".to_string(),
                "FOLIOCHART_TEST_KEY_MISSING".to_string(),
            ],
            ..RapidApiConfig::default()
        };
        assert_eq!(rapidapi.resolve_credentials(), vec!["inline", "env-key"]);
    }

    #[test]
    fn test_retry_budget() {
        let fetch = FetchConfig::default();
        assert_eq!(fetch.retry_budget(1), 2);
        assert_eq!(fetch.retry_budget(3), 6);
        assert_eq!(fetch.retry_budget(0), 0);

        let zero = FetchConfig {
            retry_budget_multiplier: 0,
            ..FetchConfig::default()
        };
        assert_eq!(zero.retry_budget(2), 2);
    }
}
