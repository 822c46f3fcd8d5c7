use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts;

/// Custom Result
///
/// Effectively, equivalent to `Result<T, error_stack::Report<E>>`.
pub type CustomResult<T, E> = error_stack::Result<T, E>;

/// Error body the provider returns alongside a non-2xx status. The HTTP
/// status code is mirrored in the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub status: u16,
    pub title: String,
    pub detail: String,
    #[serde(default)]
    pub field: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.title, self.detail)
    }
}

/// Failures raised by the provider client. Provider-level rejections are
/// carried as structured data so callers match on error kind instead of
/// sniffing strings or status codes.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The provider transported a response whose body encodes a failure.
    #[error("provider rejected the request: {0}")]
    Api(ApiErrorBody),
    /// Network failure, timeout or a response that never reached JSON.
    #[error("failed to reach the provider")]
    Transport,
    #[error("failed to decode provider response")]
    ResponseDecoding,
    #[error("failed to encode provider request")]
    RequestEncoding,
    #[error("missing required field: {field_name}")]
    MissingRequiredField { field_name: &'static str },
    #[error("invalid value provided for field: {field_name}")]
    InvalidValue { field_name: &'static str },
}

impl ClientError {
    pub fn api_status(&self) -> Option<u16> {
        match self {
            Self::Api(body) => Some(body.status),
            _ => None,
        }
    }

    /// Rate limits and transient upstream failures. Whether a transient
    /// failure is actually retried is the orchestrator's call; the client
    /// only classifies.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.api_status(),
            Some(consts::HTTP_TOO_MANY_REQUESTS)
                | Some(consts::HTTP_BAD_GATEWAY)
                | Some(consts::HTTP_SERVICE_UNAVAILABLE)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_covers_only_retryable_statuses() {
        let api = |status| {
            ClientError::Api(ApiErrorBody {
                status,
                title: "t".into(),
                detail: "d".into(),
                field: None,
            })
        };
        assert!(api(429).is_transient());
        assert!(api(502).is_transient());
        assert!(api(503).is_transient());
        assert!(!api(400).is_transient());
        assert!(!api(500).is_transient());
        assert!(!ClientError::Transport.is_transient());
    }
}
