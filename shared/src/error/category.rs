//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx: Authentication errors
/// - 2xxx: Permission errors
/// - 4xxx: Issue errors
/// - 5xxx: Payment errors
/// - 6xxx: User / staff account errors
/// - 9xxx: System errors
///
/// Unassigned ranges (3xxx, 7xxx, 8xxx) fall back to `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Issue errors (4xxx)
    Issue,
    /// Payment errors (5xxx)
    Payment,
    /// User and staff account errors (6xxx)
    Account,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            4000..5000 => Self::Issue,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Account,
            9000.. => Self::System,
            _ => Self::General,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Issue => "issue",
            Self::Payment => "payment",
            Self::Account => "account",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(8), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2005), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3500), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(4003), ErrorCategory::Issue);
        assert_eq!(ErrorCategory::from_code(5003), ErrorCategory::Payment);
        assert_eq!(ErrorCategory::from_code(6101), ErrorCategory::Account);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(u16::MAX), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::TokenExpired.category(), ErrorCategory::Auth);
        assert_eq!(ErrorCode::UserBlocked.category(), ErrorCategory::Permission);
        assert_eq!(ErrorCode::AlreadyUpvoted.category(), ErrorCategory::Issue);
        assert_eq!(ErrorCode::AlreadyPremium.category(), ErrorCategory::Payment);
        assert_eq!(ErrorCode::StaffNotFound.category(), ErrorCategory::Account);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_name() {
        assert_eq!(ErrorCategory::Issue.name(), "issue");
        assert_eq!(ErrorCategory::Account.name(), "account");
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Permission).unwrap();
        assert_eq!(json, "\"permission\"");
    }
}
