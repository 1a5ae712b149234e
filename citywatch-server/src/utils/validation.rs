//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Person names, issue titles
pub const MAX_NAME_LEN: usize = 200;

/// Issue descriptions, timeline messages
pub const MAX_NOTE_LEN: usize = 2000;

/// Short identifiers: phone, transaction id
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;

/// Minimum password length for staff accounts
pub const MIN_PASSWORD_LEN: usize = 6;

/// URLs / image links
pub const MAX_URL_LEN: usize = 2048;

/// Free-text locations
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Minimal shape check: one `@` with a non-empty local part and a dotted domain
pub fn validate_email(value: &str) -> Result<(), AppError> {
    validate_required_text(value, "email", MAX_EMAIL_LEN)?;
    let valid = value
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
    if !valid {
        return Err(AppError::validation(format!("invalid email address: {value}")));
    }
    Ok(())
}

pub fn validate_password(value: &str) -> Result<(), AppError> {
    if value.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    validate_required_text(value, "password", MAX_PASSWORD_LEN)
}

/// Amounts must be finite and strictly positive
pub fn validate_amount(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!("{field} must be a positive amount")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Pothole", "title", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "title", MAX_NAME_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(201), "title", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text(&None, "image", MAX_URL_LEN).is_ok());
        assert!(validate_optional_text(&Some("a".repeat(2049)), "image", MAX_URL_LEN).is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(validate_email("citizen@city.test").is_ok());
        assert!(validate_email("citizen").is_err());
        assert!(validate_email("@city.test").is_err());
        assert!(validate_email("a@b@city.test").is_err());
        assert!(validate_email("a@localhost").is_err());
    }

    #[test]
    fn test_amount() {
        assert!(validate_amount(100.0, "amount").is_ok());
        assert!(validate_amount(0.0, "amount").is_err());
        assert!(validate_amount(f64::NAN, "amount").is_err());
    }
}
