//! Auth DTOs

use serde::{Deserialize, Serialize};

use super::user::User;

/// `POST /jwt`: exchange a provider-verified email for an API token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    /// Unix millis
    pub expires_at: i64,
}

/// `POST /auth/login`: password login for staff and admin accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: User,
}
