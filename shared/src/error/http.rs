//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::IssueNotFound
            | Self::PaymentNotFound
            | Self::UserNotFound
            | Self::StaffNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::AlreadyUpvoted
            | Self::AlreadyHighPriority
            | Self::IssueAlreadyAssigned
            | Self::InvalidStatusTransition
            | Self::IssueNotEditable
            | Self::IssueFinalized
            | Self::PaymentDuplicate
            | Self::AlreadyPremium
            | Self::UserEmailExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::SessionExpired
            | Self::SessionNotVerified => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied
            | Self::RoleRequired
            | Self::AdminRequired
            | Self::CannotModifyAdmin
            | Self::UserBlocked
            | Self::NotOwner
            | Self::NotAssignee
            | Self::SelfUpvote => StatusCode::FORBIDDEN,

            // 402 Payment Required
            Self::FreeTierLimitReached | Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,

            // 502 Bad Gateway (upstream payment provider)
            Self::PaymentProviderError => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::EntitlementNotGranted => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::IssueNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StaffNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::AlreadyUpvoted.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::IssueAlreadyAssigned.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::PaymentDuplicate.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_and_permission_status() {
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::SelfUpvote.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::UserBlocked.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_payment_required_status() {
        assert_eq!(
            ErrorCode::FreeTierLimitReached.http_status(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn test_default_bad_request() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvalidPriority.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
