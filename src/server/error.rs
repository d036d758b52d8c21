//! Translation of request failures into the `{ title, message }` bodies the
//! browser client renders.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::UpstreamError;

/// Errors a proxy route can end with.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The request body could not be decoded.
    #[error("{0}")]
    UnreadableBody(String),
}

/// JSON body of every non-2xx API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub title: String,
    pub message: String,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(UpstreamError::Rejected(_)) => StatusCode::FORBIDDEN,
            ProxyError::Upstream(UpstreamError::Unreachable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(UpstreamError::LocalFailure(_))
            | ProxyError::UnreadableBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProxyError::Upstream(UpstreamError::Rejected(_)) => "Server responded with an error",
            ProxyError::Upstream(UpstreamError::Unreachable(_)) => {
                "Unable to communicate with server"
            }
            ProxyError::Upstream(UpstreamError::LocalFailure(_))
            | ProxyError::UnreadableBody(_) => "An unexpected error occurred",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = match &self {
            ProxyError::Upstream(err) => err.kind(),
            ProxyError::UnreadableBody(_) => "unreadable_body",
        };
        warn!(status = status.as_u16(), kind, error = %self, "Request failed");

        let body = ErrorBody {
            title: self.title().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
