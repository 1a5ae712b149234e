//! Unified error codes for CityWatch
//!
//! Error codes are shared by the server, the client and any frontend that
//! decodes the JSON error body. They are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Issue errors
//! - 5xxx: Payment errors
//! - 6xxx: User / staff errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so they serialize as plain
/// JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Session has expired
    SessionExpired = 1005,
    /// Action needs a live provider session, a cached identity is not enough
    SessionNotVerified = 1006,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,
    /// Cannot modify admin account
    CannotModifyAdmin = 2004,
    /// Account is blocked
    UserBlocked = 2005,
    /// Caller is not the owner of the resource
    NotOwner = 2006,
    /// Staff member is not assigned to the issue
    NotAssignee = 2007,

    // ==================== 4xxx: Issue ====================
    /// Issue not found
    IssueNotFound = 4001,
    /// Issue can no longer be edited
    IssueNotEditable = 4002,
    /// Reporter cannot upvote their own issue
    SelfUpvote = 4003,
    /// Issue already upvoted by this user
    AlreadyUpvoted = 4004,
    /// Issue already has high priority
    AlreadyHighPriority = 4005,
    /// Issue already has a staff member assigned
    IssueAlreadyAssigned = 4006,
    /// Status transition is not allowed
    InvalidStatusTransition = 4007,
    /// Free tier issue limit reached
    FreeTierLimitReached = 4008,
    /// Issue is in a final state
    IssueFinalized = 4009,
    /// Priority value not accepted by the configured scale
    InvalidPriority = 4010,

    // ==================== 5xxx: Payment ====================
    /// Payment failed
    PaymentFailed = 5001,
    /// Payment not found
    PaymentNotFound = 5002,
    /// Payment already recorded
    PaymentDuplicate = 5003,
    /// Payment required before this action
    PaymentRequired = 5004,
    /// Account is already premium
    AlreadyPremium = 5005,
    /// Payment provider error
    PaymentProviderError = 5006,
    /// Payment recorded but the entitlement was not granted
    EntitlementNotGranted = 5007,

    // ==================== 6xxx: User / Staff ====================
    /// User not found
    UserNotFound = 6001,
    /// User email already exists
    UserEmailExists = 6002,
    /// Staff member not found
    StaffNotFound = 6101,
    /// Account is not a staff account
    NotStaffAccount = 6102,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this code represents success
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field missing",
            Self::ValueOutOfRange => "Value out of range",

            // Auth
            Self::NotAuthenticated => "Not authenticated",
            Self::InvalidCredentials => "Invalid email or password",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",
            Self::SessionExpired => "Session has expired",
            Self::SessionNotVerified => "Please sign in again to continue",

            // Permission
            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required",
            Self::AdminRequired => "Admin role required",
            Self::CannotModifyAdmin => "Cannot modify admin account",
            Self::UserBlocked => "Your account is blocked",
            Self::NotOwner => "You do not own this resource",
            Self::NotAssignee => "Issue is not assigned to you",

            // Issue
            Self::IssueNotFound => "Issue not found",
            Self::IssueNotEditable => "Only pending issues can be edited",
            Self::SelfUpvote => "You cannot upvote your own issue",
            Self::AlreadyUpvoted => "You have already upvoted this issue",
            Self::AlreadyHighPriority => "Issue is already high priority",
            Self::IssueAlreadyAssigned => "Issue already has assigned staff",
            Self::InvalidStatusTransition => "Status transition not allowed",
            Self::FreeTierLimitReached => "Free tier issue limit reached, upgrade to premium",
            Self::IssueFinalized => "Issue is already finalized",
            Self::InvalidPriority => "Invalid priority",

            // Payment
            Self::PaymentFailed => "Payment failed",
            Self::PaymentNotFound => "Payment not found",
            Self::PaymentDuplicate => "Payment already recorded",
            Self::PaymentRequired => "Payment required",
            Self::AlreadyPremium => "Account is already premium",
            Self::PaymentProviderError => "Payment provider error",
            Self::EntitlementNotGranted => "Payment recorded but the upgrade was not applied",

            // User / Staff
            Self::UserNotFound => "User not found",
            Self::UserEmailExists => "Email already registered",
            Self::StaffNotFound => "Staff not found",
            Self::NotStaffAccount => "Account is not a staff account",

            // System
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Operation timed out",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(Self::Success),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::ValidationFailed),
            3 => Ok(Self::NotFound),
            4 => Ok(Self::AlreadyExists),
            5 => Ok(Self::InvalidRequest),
            6 => Ok(Self::InvalidFormat),
            7 => Ok(Self::RequiredField),
            8 => Ok(Self::ValueOutOfRange),

            // Auth
            1001 => Ok(Self::NotAuthenticated),
            1002 => Ok(Self::InvalidCredentials),
            1003 => Ok(Self::TokenExpired),
            1004 => Ok(Self::TokenInvalid),
            1005 => Ok(Self::SessionExpired),
            1006 => Ok(Self::SessionNotVerified),

            // Permission
            2001 => Ok(Self::PermissionDenied),
            2002 => Ok(Self::RoleRequired),
            2003 => Ok(Self::AdminRequired),
            2004 => Ok(Self::CannotModifyAdmin),
            2005 => Ok(Self::UserBlocked),
            2006 => Ok(Self::NotOwner),
            2007 => Ok(Self::NotAssignee),

            // Issue
            4001 => Ok(Self::IssueNotFound),
            4002 => Ok(Self::IssueNotEditable),
            4003 => Ok(Self::SelfUpvote),
            4004 => Ok(Self::AlreadyUpvoted),
            4005 => Ok(Self::AlreadyHighPriority),
            4006 => Ok(Self::IssueAlreadyAssigned),
            4007 => Ok(Self::InvalidStatusTransition),
            4008 => Ok(Self::FreeTierLimitReached),
            4009 => Ok(Self::IssueFinalized),
            4010 => Ok(Self::InvalidPriority),

            // Payment
            5001 => Ok(Self::PaymentFailed),
            5002 => Ok(Self::PaymentNotFound),
            5003 => Ok(Self::PaymentDuplicate),
            5004 => Ok(Self::PaymentRequired),
            5005 => Ok(Self::AlreadyPremium),
            5006 => Ok(Self::PaymentProviderError),
            5007 => Ok(Self::EntitlementNotGranted),

            // User / Staff
            6001 => Ok(Self::UserNotFound),
            6002 => Ok(Self::UserEmailExists),
            6101 => Ok(Self::StaffNotFound),
            6102 => Ok(Self::NotStaffAccount),

            // System
            9001 => Ok(Self::InternalError),
            9002 => Ok(Self::DatabaseError),
            9003 => Ok(Self::NetworkError),
            9004 => Ok(Self::TimeoutError),
            9005 => Ok(Self::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::IssueNotFound.code(), 4001);
        assert_eq!(ErrorCode::SelfUpvote.code(), 4003);
        assert_eq!(ErrorCode::FreeTierLimitReached.code(), 4008);
        assert_eq!(ErrorCode::PaymentDuplicate.code(), 5003);
        assert_eq!(ErrorCode::UserNotFound.code(), 6001);
        assert_eq!(ErrorCode::StaffNotFound.code(), 6101);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::AlreadyUpvoted.is_success());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(1003), Ok(ErrorCode::TokenExpired));
        assert_eq!(ErrorCode::try_from(4006), Ok(ErrorCode::IssueAlreadyAssigned));
        assert_eq!(ErrorCode::try_from(5007), Ok(ErrorCode::EntitlementNotGranted));
        assert_eq!(ErrorCode::try_from(6102), Ok(ErrorCode::NotStaffAccount));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(3001), Err(InvalidErrorCode(3001)));
        assert_eq!(ErrorCode::try_from(u16::MAX), Err(InvalidErrorCode(u16::MAX)));
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::AlreadyUpvoted).unwrap();
        assert_eq!(json, "4004");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("2004").unwrap();
        assert_eq!(code, ErrorCode::CannotModifyAdmin);
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("4242");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::InvalidStatusTransition), "4007");
        assert_eq!(format!("{}", InvalidErrorCode(77)), "invalid error code: 77");
    }

    #[test]
    fn test_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::SessionNotVerified,
            ErrorCode::NotAssignee,
            ErrorCode::InvalidPriority,
            ErrorCode::PaymentProviderError,
            ErrorCode::ConfigError,
        ];
        for code in codes {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }
}
