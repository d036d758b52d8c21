//! Handlers for the `/api` endpoints. Each one makes exactly one upstream call.

use axum::{Json, extract::State};
use serde::Deserialize;

use super::{AppState, error::ProxyError, extract::Payload};
use crate::core::{ConversionResult, RateSet, SymbolSet};

#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoricalBody {
    pub date: String,
}

/// `GET /api/rates` — latest rates for the configured symbols.
pub async fn rates(State(state): State<AppState>) -> Result<Json<RateSet>, ProxyError> {
    Ok(Json(state.rates.latest_rates().await?))
}

/// `GET /api/symbols` — supported currency codes and names.
pub async fn symbols(State(state): State<AppState>) -> Result<Json<SymbolSet>, ProxyError> {
    Ok(Json(state.rates.symbols().await?))
}

/// `POST /api/convert` — rate for one currency pair.
pub async fn convert(
    State(state): State<AppState>,
    Payload(body): Payload<ConvertBody>,
) -> Result<Json<ConversionResult>, ProxyError> {
    Ok(Json(state.converter.convert(&body.from, &body.to).await?))
}

/// `POST /api/historical` — rates as of the given day. The date goes to the
/// provider exactly as received.
pub async fn historical(
    State(state): State<AppState>,
    Payload(body): Payload<HistoricalBody>,
) -> Result<Json<RateSet>, ProxyError> {
    Ok(Json(state.rates.historical_rates(&body.date).await?))
}
