//! Payload types and the provider seams the proxy server delegates to.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::UpstreamError;

/// Exchange rates against one base currency on one day.
///
/// `rates` keeps the order in which the provider listed the currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    pub base: String,
    pub date: String,
    pub rates: IndexMap<String, f64>,
}

/// Currency code to display name, e.g. `"USD" -> "United States Dollar"`.
pub type SymbolSet = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub rate: f64,
}

/// Latest, historical and symbol data from a rates provider.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn latest_rates(&self) -> Result<RateSet, UpstreamError>;

    async fn symbols(&self) -> Result<SymbolSet, UpstreamError>;

    /// Rates as of `date`. The date is forwarded untouched; the provider
    /// decides whether it is valid.
    async fn historical_rates(&self, date: &str) -> Result<RateSet, UpstreamError>;
}

/// Pairwise conversion rate between two currencies.
#[async_trait]
pub trait ConversionProvider: Send + Sync {
    async fn convert(&self, from: &str, to: &str) -> Result<ConversionResult, UpstreamError>;
}
