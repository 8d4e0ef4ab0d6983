use super::{ChartRequest, ChartSource};
use crate::core::{ChartPayload, FetchError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, instrument};

const CHART_PATH: &str = "/api/stock/get-chart";

/// Yahoo Finance chart data served through the RapidAPI gateway.
pub struct YahooChartSource {
    base_url: String,
    host: String,
    client: reqwest::Client,
}

impl YahooChartSource {
    /// Every request made by this source is bounded by `timeout`.
    pub fn new(base_url: &str, host: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("foliochart/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(YahooChartSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            host: host.to_string(),
            client,
        })
    }

    fn chart_url(&self, request: &ChartRequest) -> Result<Url, FetchError> {
        let symbol = request.symbol.as_str();
        Url::parse_with_params(
            &format!("{}{}", self.base_url, CHART_PATH),
            &[
                ("symbol", symbol),
                ("range", request.range.as_str()),
                ("interval", request.interval.as_str()),
                ("region", request.region()),
            ],
        )
        .map_err(|e| FetchError::Transport {
            symbol: symbol.to_string(),
            message: format!("invalid URL: {e}"),
        })
    }
}

#[async_trait]
impl ChartSource for YahooChartSource {
    #[instrument(
        name = "YahooChartFetch",
        skip(self, request, credential),
        fields(symbol = %request.symbol, range = %request.range, interval = %request.interval)
    )]
    async fn fetch_chart(
        &self,
        request: &ChartRequest,
        credential: &str,
    ) -> Result<ChartPayload, FetchError> {
        let symbol = request.symbol.as_str();
        let url = self.chart_url(request)?;
        debug!("Requesting chart data from {}", url);

        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", credential)
            .header("x-rapidapi-host", &self.host)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                symbol: symbol.to_string(),
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| FetchError::Transport {
            symbol: symbol.to_string(),
            message: format!("failed to read body: {e}"),
        })?;

        let payload = ChartPayload::parse(symbol, &text)?;
        debug!(points = payload.timestamps().len(), "Received chart data");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Interval, Range, Symbol};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "currency": "USD", "shortName": "Apple Inc."},
                "timestamp": [1700000000, 1700086400, 1700172800],
                "indicators": {"quote": [{"close": [189.5, 190.0, 191.25]}]}
            }],
            "error": null
        }
    }"#;

    fn source(server: &MockServer) -> YahooChartSource {
        YahooChartSource::new(&server.uri(), "test-host", Duration::from_millis(500)).unwrap()
    }

    fn request(symbol: &str) -> ChartRequest {
        ChartRequest::new(Symbol::from(symbol), Range::OneMonth, Interval::OneDay)
    }

    #[tokio::test]
    async fn test_successful_chart_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHART_PATH))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("range", "1mo"))
            .and(query_param("interval", "1d"))
            .and(query_param("region", "US"))
            .and(header("x-rapidapi-key", "key-1"))
            .and(header("x-rapidapi-host", "test-host"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let payload = source(&mock_server)
            .fetch_chart(&request("AAPL"), "key-1")
            .await
            .unwrap();
        assert_eq!(payload.meta().currency.as_deref(), Some("USD"));
        assert_eq!(payload.timestamps().len(), 3);
        assert_eq!(payload.closes()[2], Some(191.25));
    }

    #[tokio::test]
    async fn test_indian_symbol_uses_in_region() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHART_PATH))
            .and(query_param("symbol", "RELIANCE.NS"))
            .and(query_param("region", "IN"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = source(&mock_server)
            .fetch_chart(&request("RELIANCE.NS"), "key-1")
            .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHART_PATH))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let err = source(&mock_server)
            .fetch_chart(&request("AAPL"), "key-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                symbol: "AAPL".to_string(),
                status: 429,
            }
        );
        assert_eq!(err.to_string(), "HTTP error: 429 for symbol: AAPL");
    }

    #[tokio::test]
    async fn test_missing_result_array() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHART_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"message": "quota exceeded"}"#),
            )
            .mount(&mock_server)
            .await;

        let err = source(&mock_server)
            .fetch_chart(&request("AAPL"), "key-1")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHART_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(CHART_BODY)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let err = source(&mock_server)
            .fetch_chart(&request("AAPL"), "key-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Transport {
                symbol: "AAPL".to_string(),
                message: "request timed out".to_string(),
            }
        );
    }
}
