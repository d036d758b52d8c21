//! Failure taxonomy shared by the upstream provider clients.

use thiserror::Error;

/// Why an upstream call did not produce a payload.
///
/// The message carried by each variant is safe to show to a browser: it never
/// contains the request URL and therefore never the API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The provider answered but declined the request.
    #[error("{0}")]
    Rejected(String),
    /// No response was received (connect failure, timeout, broken transfer).
    #[error("{0}")]
    Unreachable(String),
    /// The request could not be built or the response could not be understood.
    #[error("{0}")]
    LocalFailure(String),
}

impl UpstreamError {
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Rejected(_) => "rejected",
            UpstreamError::Unreachable(_) => "unreachable",
            UpstreamError::LocalFailure(_) => "local_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_the_bare_message() {
        let err = UpstreamError::Rejected("invalid_access_key".to_string());
        assert_eq!(err.to_string(), "invalid_access_key");
        assert_eq!(err.kind(), "rejected");
    }
}
