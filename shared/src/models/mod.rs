//! Data models
//!
//! Shared between the server and the client (via the REST API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Wire format is camelCase; row ids are `i64` snowflakes.

pub mod auth;
pub mod issue;
pub mod payment;
pub mod staff;
pub mod user;

// Re-exports
pub use auth::*;
pub use issue::*;
pub use payment::*;
pub use staff::*;
pub use user::*;
