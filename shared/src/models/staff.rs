//! Staff Model

use serde::{Deserialize, Serialize};

/// Staff member (a `users` row with role staff)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StaffMember {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub phone: Option<String>,
    pub created_at: i64,
}

/// Create staff payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffCreate {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Update staff payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUpdate {
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}
