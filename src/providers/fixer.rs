use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

use super::util::{REQUEST_TIMEOUT, build_client, endpoint, fetch_json, parse_base_url};
use crate::core::config::{ApiKey, FixerProviderConfig};
use crate::core::{RateProvider, RateSet, SymbolSet, UpstreamError};

/// Outcome of a fixer.io style `{ success, error?, ...payload }` response.
#[derive(Debug, PartialEq)]
enum Envelope<T> {
    Ok(T),
    Rejected(String),
}

#[derive(Deserialize, Debug)]
struct EnvelopeHead {
    success: bool,
    error: Option<Fault>,
}

#[derive(Deserialize, Debug)]
struct Fault {
    #[serde(rename = "type")]
    kind: Option<String>,
    info: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SymbolsPayload {
    symbols: SymbolSet,
}

impl<T: DeserializeOwned> Envelope<T> {
    fn decode(body: Value) -> Result<Self, UpstreamError> {
        let head = EnvelopeHead::deserialize(&body).map_err(|e| {
            UpstreamError::LocalFailure(format!("Unexpected rates response: {e}"))
        })?;

        if !head.success {
            let reason = head
                .error
                .and_then(|fault| fault.kind.or(fault.info))
                .unwrap_or_else(|| "Rates provider reported a failure".to_string());
            return Ok(Envelope::Rejected(reason));
        }

        serde_json::from_value(body)
            .map(Envelope::Ok)
            .map_err(|e| UpstreamError::LocalFailure(format!("Unexpected rates payload: {e}")))
    }
}

/// Client for a fixer.io compatible rates API.
pub struct FixerProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: ApiKey,
    symbols: String,
    base: String,
    timeout: Duration,
}

impl FixerProvider {
    pub fn new(config: &FixerProviderConfig) -> Result<Self> {
        Ok(FixerProvider {
            client: build_client()?,
            base_url: parse_base_url(&config.base_url)?,
            api_key: config.api_key.clone(),
            symbols: config.symbols.join(","),
            base: config.base.clone(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segment: &str,
        with_symbols: bool,
    ) -> Result<T, UpstreamError> {
        let mut params = vec![("access_key", self.api_key.expose())];
        if with_symbols {
            params.push(("symbols", self.symbols.as_str()));
            params.push(("base", self.base.as_str()));
        }
        let url = endpoint(&self.base_url, segment, &params)?;

        match Envelope::decode(fetch_json(&self.client, url, self.timeout).await?)? {
            Envelope::Ok(payload) => Ok(payload),
            Envelope::Rejected(reason) => Err(UpstreamError::Rejected(reason)),
        }
    }
}

#[async_trait]
impl RateProvider for FixerProvider {
    #[instrument(name = "FixerLatest", skip(self))]
    async fn latest_rates(&self) -> Result<RateSet, UpstreamError> {
        self.get("latest", true).await
    }

    #[instrument(name = "FixerSymbols", skip(self))]
    async fn symbols(&self) -> Result<SymbolSet, UpstreamError> {
        self.get::<SymbolsPayload>("symbols", false)
            .await
            .map(|payload| payload.symbols)
    }

    #[instrument(name = "FixerHistorical", skip(self))]
    async fn historical_rates(&self, date: &str) -> Result<RateSet, UpstreamError> {
        self.get(date, true).await
    }
}
