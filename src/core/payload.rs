//! Provider chart payload
//!
//! Mirrors the nested `chart.result[]` document returned by the quote provider. Only
//! fields the charts use are modelled; everything is optional because the provider
//! omits keys freely for thinly traded instruments.

use super::error::FetchError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartItem>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartItem {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    #[serde(default)]
    pub indicators: Option<Indicators>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub exchange_name: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
    #[serde(default)]
    pub chart_previous_close: Option<f64>,
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    pub gmtoffset: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteBars>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteBars {
    #[serde(default)]
    pub open: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub high: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub low: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub close: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub volume: Option<Vec<Option<f64>>>,
}

/// First chart result of a provider response that was known to carry one.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPayload {
    item: ChartItem,
}

impl ChartPayload {
    /// Rejects responses without a `chart.result` entry; an absent array is a provider
    /// error, not an empty series.
    pub fn from_response(symbol: &str, response: ChartResponse) -> Result<Self, FetchError> {
        let ChartEnvelope { result, error } = response.chart;
        let reason = match result {
            Some(items) => match items.into_iter().next() {
                Some(item) => return Ok(Self { item }),
                None => "empty chart.result".to_string(),
            },
            None => match error {
                Some(err) if !err.is_null() => format!("provider error: {err}"),
                _ => "missing chart.result".to_string(),
            },
        };
        Err(FetchError::Malformed {
            symbol: symbol.to_string(),
            reason,
        })
    }

    /// Decodes a raw response body.
    pub fn parse(symbol: &str, body: &str) -> Result<Self, FetchError> {
        let response: ChartResponse =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed {
                symbol: symbol.to_string(),
                reason: format!("Failed to parse JSON response: {e}"),
            })?;
        Self::from_response(symbol, response)
    }

    pub fn meta(&self) -> &ChartMeta {
        &self.item.meta
    }

    pub fn timestamps(&self) -> &[i64] {
        self.item.timestamp.as_deref().unwrap_or_default()
    }

    /// Close prices of the first quote series; `None` marks a bar without a trade.
    pub fn closes(&self) -> &[Option<f64>] {
        self.item
            .indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.close.as_deref())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "AAPL",
                        "currency": "USD",
                        "shortName": "Apple Inc.",
                        "exchangeName": "NMS",
                        "regularMarketPrice": 190.5,
                        "gmtoffset": -14400
                    },
                    "timestamp": [1700000000, 1700086400],
                    "indicators": {
                        "quote": [{
                            "open": [188.0, 189.0],
                            "high": [191.0, 192.0],
                            "low": [187.0, 188.5],
                            "close": [189.5, null],
                            "volume": [1000, 2000]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let payload = ChartPayload::parse("AAPL", body).unwrap();
        assert_eq!(payload.meta().symbol.as_deref(), Some("AAPL"));
        assert_eq!(payload.meta().short_name.as_deref(), Some("Apple Inc."));
        assert_eq!(payload.meta().gmtoffset, Some(-14400));
        assert_eq!(payload.timestamps(), &[1700000000, 1700086400]);
        assert_eq!(payload.closes(), &[Some(189.5), None]);
    }

    #[test]
    fn test_missing_result_is_malformed() {
        let err = ChartPayload::parse("AAPL", r#"{"chart": {"results": []}}"#).unwrap_err();
        assert_eq!(
            err,
            FetchError::Malformed {
                symbol: "AAPL".to_string(),
                reason: "missing chart.result".to_string(),
            }
        );

        let err = ChartPayload::parse("AAPL", r#"{"chart": {"result": []}}"#).unwrap_err();
        assert!(err.to_string().contains("empty chart.result"));

        let err = ChartPayload::parse(
            "AAPL",
            r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("provider error"));

        let err = ChartPayload::parse("AAPL", "<html>rate limited</html>").unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }

    #[test]
    fn test_missing_series_arrays_are_empty() {
        let payload =
            ChartPayload::parse("X", r#"{"chart": {"result": [{"meta": {}}]}}"#).unwrap();
        assert!(payload.timestamps().is_empty());
        assert!(payload.closes().is_empty());
    }
}
