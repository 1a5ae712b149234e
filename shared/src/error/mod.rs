//! Unified error system for CityWatch
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: response envelope (`{code, message, data?, details?}`)
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Issue errors
//! - 5xxx: Payment errors
//! - 6xxx: User / staff errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::ValidationFailed, "Title is required")
//!     .with_detail("field", "title");
//! assert_eq!(err.code.code(), 2);
//! assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
