use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{REQUEST_TIMEOUT, build_client, endpoint, fetch_json, parse_base_url};
use crate::core::config::{ApiKey, FreeCurrencyProviderConfig};
use crate::core::{ConversionProvider, ConversionResult, UpstreamError};

/// Client for the free.currconv.com conversion API.
pub struct FreeCurrencyProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: ApiKey,
    timeout: Duration,
}

impl FreeCurrencyProvider {
    pub fn new(config: &FreeCurrencyProviderConfig) -> Result<Self> {
        Ok(FreeCurrencyProvider {
            client: build_client()?,
            base_url: parse_base_url(&config.base_url)?,
            api_key: config.api_key.clone(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Pulls the rate out of a compact response such as `{"USD_EUR":{"val":0.85}}`.
///
/// The key is not checked against the requested pair, but there must be
/// exactly one and it must hold a finite positive `val`.
fn extract_rate(pair: &str, body: Value) -> Result<f64, UpstreamError> {
    let Value::Object(entries) = body else {
        return Err(UpstreamError::LocalFailure(format!(
            "Unexpected conversion response for {pair}"
        )));
    };

    let mut entries = entries.into_iter();
    let (key, entry) = match (entries.next(), entries.next()) {
        (Some(only), None) => only,
        (None, _) => {
            return Err(UpstreamError::LocalFailure(format!(
                "No conversion rate returned for {pair}"
            )));
        }
        (Some(_), Some(_)) => {
            return Err(UpstreamError::LocalFailure(format!(
                "Ambiguous conversion response for {pair}"
            )));
        }
    };

    let val = entry.get("val").and_then(Value::as_f64).ok_or_else(|| {
        UpstreamError::LocalFailure(format!("Conversion response for {key} has no numeric rate"))
    })?;
    if !val.is_finite() || val <= 0.0 {
        return Err(UpstreamError::LocalFailure(format!(
            "Conversion rate for {key} is not a positive number: {val}"
        )));
    }
    Ok(val)
}

#[async_trait]
impl ConversionProvider for FreeCurrencyProvider {
    #[instrument(name = "FreeCurrencyConvert", skip(self))]
    async fn convert(&self, from: &str, to: &str) -> Result<ConversionResult, UpstreamError> {
        let pair = format!("{from}_{to}");
        let url = endpoint(
            &self.base_url,
            "convert",
            &[
                ("q", pair.as_str()),
                ("compact", "y"),
                ("apiKey", self.api_key.expose()),
            ],
        )?;

        let body = fetch_json(&self.client, url, self.timeout).await?;
        let rate = extract_rate(&pair, body)?;
        debug!(%pair, rate, "Converted currency pair");
        Ok(ConversionResult { rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(pair: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/convert"))
            .and(query_param("q", pair))
            .and(query_param("compact", "y"))
            .and(query_param("apiKey", "fcc-key"))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(mock_server: &MockServer) -> FreeCurrencyProvider {
        let config = FreeCurrencyProviderConfig {
            base_url: mock_server.uri(),
            api_key: ApiKey::new("fcc-key"),
        };
        FreeCurrencyProvider::new(&config).unwrap()
    }

    #[test]
    fn test_extract_rate_accepts_single_entry() {
        let rate = extract_rate("USD_EUR", json!({"USD_EUR": {"val": 0.85}})).unwrap();
        assert_eq!(rate, 0.85);

        // The key is opaque.
        let rate = extract_rate("USD_EUR", json!({"usd-eur": {"val": 2}})).unwrap();
        assert_eq!(rate, 2.0);
    }

    #[test]
    fn test_extract_rate_rejects_malformed_envelopes() {
        let cases = [
            json!({}),
            json!({"USD_EUR": {"val": 0.85}, "EUR_USD": {"val": 1.17}}),
            json!({"USD_EUR": {"value": 0.85}}),
            json!({"USD_EUR": {"val": "0.85"}}),
            json!({"USD_EUR": 0.85}),
            json!({"USD_EUR": {"val": 0}}),
            json!({"USD_EUR": {"val": -1.5}}),
            json!([{"val": 0.85}]),
            json!(null),
        ];
        for body in cases {
            let result = extract_rate("USD_EUR", body.clone());
            assert!(
                matches!(result, Err(UpstreamError::LocalFailure(_))),
                "expected local failure for {body}, got {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_successful_conversion() {
        let mock_server = create_mock_server(
            "USD_EUR",
            ResponseTemplate::new(200).set_body_string(r#"{"USD_EUR":{"val":0.85}}"#),
        )
        .await;

        let result = provider(&mock_server).convert("USD", "EUR").await.unwrap();
        assert_eq!(result, ConversionResult { rate: 0.85 });
        assert!(result.rate.is_finite() && result.rate > 0.0);
    }

    #[tokio::test]
    async fn test_unknown_pair_is_local_failure() {
        let mock_server =
            create_mock_server("USD_XYZ", ResponseTemplate::new(200).set_body_string("{}")).await;

        let result = provider(&mock_server).convert("USD", "XYZ").await;
        assert_eq!(
            result.unwrap_err(),
            UpstreamError::LocalFailure("No conversion rate returned for USD_XYZ".to_string())
        );
    }

    #[tokio::test]
    async fn test_provider_error_status_is_rejected() {
        let mock_server = create_mock_server(
            "USD_EUR",
            ResponseTemplate::new(400)
                .set_body_string(r#"{"status":400,"error":"Invalid API Key."}"#),
        )
        .await;

        let result = provider(&mock_server).convert("USD", "EUR").await;
        assert_eq!(
            result.unwrap_err(),
            UpstreamError::Rejected("Invalid API Key.".to_string())
        );
    }

    #[tokio::test]
    async fn test_slow_provider_is_unreachable() {
        let mock_server = create_mock_server(
            "USD_EUR",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"USD_EUR":{"val":0.85}}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let result = provider(&mock_server)
            .with_timeout(Duration::from_millis(50))
            .convert("USD", "EUR")
            .await;
        assert!(matches!(result, Err(UpstreamError::Unreachable(_))));
    }
}
