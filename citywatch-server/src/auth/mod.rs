//! 认证模块
//!
//! - [`JwtService`] - 令牌签发与验证
//! - [`require_auth`] / [`require_admin`] - 中间件
//! - [`CurrentUser`] - 提取器
//! - [`password`] - Argon2 哈希

mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{CurrentUserExt, require_admin, require_auth};
pub use password::{hash_password, verify_password};
