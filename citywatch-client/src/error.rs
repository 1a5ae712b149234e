//! Client error types

use serde_json::Value;
use shared::{Denial, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Structured error returned by the server
    #[error("API error {code}: {message}")]
    Api {
        code: u16,
        message: String,
        details: Option<Value>,
    },

    /// Refused by the local role gate; no request was sent
    #[error("{0}")]
    Denied(Denial),

    /// Non-JSON failure body or unexpected payload
    #[error("Invalid response ({status}): {body}")]
    InvalidResponse { status: u16, body: String },

    /// The session blob on disk could not be read or written
    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payment is on record but the follow-up call failed. Nothing is retried
    /// or refunded; the transaction id is kept for support.
    #[error("Payment {transaction_id} was recorded but the upgrade failed: {cause}")]
    EntitlementNotGranted {
        transaction_id: String,
        #[source]
        cause: Box<ClientError>,
    },
}

impl ClientError {
    /// Server or gate error code, when there is one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => ErrorCode::try_from(*code).ok(),
            Self::Denied(denial) => Some(denial.code()),
            Self::EntitlementNotGranted { .. } => Some(ErrorCode::EntitlementNotGranted),
            Self::Http(e) if e.is_timeout() => Some(ErrorCode::TimeoutError),
            Self::Http(_) => Some(ErrorCode::NetworkError),
            _ => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

impl From<Denial> for ClientError {
    fn from(denial: Denial) -> Self {
        Self::Denied(denial)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let api = ClientError::Api {
            code: 4004,
            message: "You have already upvoted this issue".into(),
            details: None,
        };
        assert_eq!(api.code(), Some(ErrorCode::AlreadyUpvoted));

        let denied = ClientError::from(Denial::SelfUpvote);
        assert!(denied.is_denied());
        assert_eq!(denied.code(), Some(ErrorCode::SelfUpvote));
        assert_eq!(denied.to_string(), "You cannot upvote your own issue");
    }

    #[test]
    fn test_entitlement_keeps_transaction_and_cause() {
        let err = ClientError::EntitlementNotGranted {
            transaction_id: "pi_123".into(),
            cause: Box::new(ClientError::Api {
                code: 9002,
                message: "Database error".into(),
                details: None,
            }),
        };
        assert_eq!(err.code(), Some(ErrorCode::EntitlementNotGranted));
        assert!(err.to_string().contains("pi_123"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
