//! Shared types for CityWatch
//!
//! Domain models, error codes, the issue status machine, the role gate and
//! the aggregation helpers used by both the server and the client.

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod stats;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use policy::{Action, Actor, Denial, GatePolicy, Resource, allowed_actions, can_perform};
