use alloy::transports::{RpcError, TransportError};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single balance cell (one address, one network, one token).
///
/// Never escapes the balance fetcher: every variant degrades the cell to zero.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
}

impl FetchError {
    /// Transport failures and timeouts are worth another attempt; a node that
    /// answered with garbage or an error object will answer the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::Malformed(_) => "malformed",
            Self::Rpc { .. } => "rpc",
            Self::InvalidAddress(_) => "invalid_address",
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::Rpc {
                code: payload.code,
                message: payload.message.to_string(),
            },
            RpcError::NullResp => Self::Malformed("missing result".to_string()),
            RpcError::DeserError { err, .. } => Self::Malformed(err.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Failure talking to the external price provider.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price provider returned status {0}")]
    Status(u16),
    #[error("price provider response could not be decoded: {0}")]
    Decode(String),
}

/// Pipeline-wide failure of a refresh, as opposed to a degraded cell.
#[derive(Debug, Clone, Error)]
pub enum AggregatorError {
    #[error("balance refresh failed: {0}")]
    Pipeline(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;

    #[test]
    fn test_rpc_error_payload_maps_to_rpc() {
        let payload: ErrorPayload =
            serde_json::from_str(r#"{"code":-32000,"message":"header not found"}"#).unwrap();
        let err = FetchError::from(TransportError::ErrorResp(payload));
        assert!(matches!(err, FetchError::Rpc { code: -32000, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_null_response_is_malformed() {
        let err = FetchError::from(TransportError::NullResp);
        assert_eq!(err.kind(), "malformed");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert!(FetchError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(FetchError::Transport("connection refused".into()).is_retryable());
    }
}
