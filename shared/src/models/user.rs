//! User Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum Role {
    #[default]
    Citizen,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User entity (password hash never leaves the server)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub role: Role,
    pub is_blocked: bool,
    pub is_premium: bool,
    pub premium_at: Option<i64>,
    pub phone: Option<String>,
    pub created_at: i64,
}

/// Register payload (`POST /users`), always creates a citizen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub email: String,
    pub name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Profile update payload (`PUT /users/{email}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Block / unblock payload (`PATCH /users/block/{email}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub is_blocked: bool,
}

/// `GET /users/role/{email}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleResponse {
    pub role: Role,
}

/// `GET /users` filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub role: Option<Role>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Staff).unwrap(), "\"staff\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert!(role.is_admin());
    }

    #[test]
    fn test_user_photo_url_field_name() {
        let user = User {
            id: 1,
            email: "c@city.test".into(),
            name: "C".into(),
            photo_url: Some("https://img/c.png".into()),
            role: Role::Citizen,
            is_blocked: false,
            is_premium: true,
            premium_at: Some(5),
            phone: None,
            created_at: 1,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["photoURL"], "https://img/c.png");
        assert_eq!(json["isPremium"], true);
    }
}
