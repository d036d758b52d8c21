//! The HTTP proxy in front of the upstream providers.

pub mod error;
pub mod extract;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::core::{ConversionProvider, RateProvider};

/// Providers shared by every request. Nothing in here is mutable.
#[derive(Clone)]
pub struct AppState {
    pub rates: Arc<dyn RateProvider>,
    pub converter: Arc<dyn ConversionProvider>,
}

impl AppState {
    pub fn new(rates: Arc<dyn RateProvider>, converter: Arc<dyn ConversionProvider>) -> Self {
        AppState { rates, converter }
    }
}

/// Builds the API routes plus static file serving from `public_dir`. Paths
/// that match no file are answered with the client's `index.html`.
pub fn create_router(state: AppState, public_dir: &Path) -> Router {
    let index = ServeFile::new(public_dir.join("index.html"));

    Router::new()
        .route("/api/rates", get(routes::rates))
        .route("/api/symbols", get(routes::symbols))
        .route("/api/convert", post(routes::convert))
        .route("/api/historical", post(routes::historical))
        .fallback_service(ServeDir::new(public_dir).fallback(index))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
