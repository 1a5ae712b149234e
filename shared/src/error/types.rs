//! AppError and the response envelope

use std::collections::HashMap;

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::category::ErrorCategory;
use super::codes::ErrorCode;

/// Error returned by every handler; serialised as `{code, message, details}`
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    /// Structured context such as the offending field, id or limit
    pub details: Option<HashMap<String, Value>>,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    // -- auth --

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    pub fn admin_required() -> Self {
        Self::new(ErrorCode::AdminRequired)
    }

    // -- lookups --

    pub fn issue_not_found(id: i64) -> Self {
        Self::new(ErrorCode::IssueNotFound).with_detail("id", id)
    }

    pub fn user_not_found(email: impl Into<String>) -> Self {
        Self::new(ErrorCode::UserNotFound).with_detail("email", email.into())
    }
}

/// Response envelope. Success carries `data` with code 0; failures carry
/// the error code and optional details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: Some(ErrorCode::Success.code()),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error");
        }
        (status, Json(ApiResponse::<()>::from(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_message_and_details() {
        let err = AppError::issue_not_found(7);
        assert_eq!(err.code, ErrorCode::IssueNotFound);
        assert_eq!(err.message, "Issue not found");
        assert_eq!(err.details.unwrap().get("id").unwrap(), 7);

        let err = AppError::validation("Title is required")
            .with_detail("field", "title")
            .with_detail("max", 120);
        assert_eq!(err.to_string(), "Title is required");
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "title");
        assert_eq!(details.get("max").unwrap(), 120);
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AppError::issue_not_found(1).http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::unauthorized().http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::admin_required().http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::new(ErrorCode::AlreadyUpvoted).http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_error_body_shape() {
        let err = AppError::new(ErrorCode::SelfUpvote).with_detail("issueId", 5);
        let body = serde_json::to_value(ApiResponse::<()>::from(err)).unwrap();
        assert_eq!(body["code"], 4003);
        assert_eq!(body["message"], "You cannot upvote your own issue");
        assert_eq!(body["details"]["issueId"], 5);
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_string(&ApiResponse::success(3)).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"OK","data":3}"#);
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::new(ErrorCode::FreeTierLimitReached).into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }
}
