//! JWT 令牌服务
//!
//! 处理 JWT 令牌的生成、验证和解析。令牌主体 (`sub`) 为用户邮箱。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use shared::models::Role;
use thiserror::Error;

/// Minimum accepted secret length
pub const MIN_SECRET_LEN: usize = 32;

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (应至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
    /// 令牌签发者
    pub issuer: String,
    /// 令牌受众
    pub audience: String,
}

impl JwtConfig {
    /// Development config with a freshly generated secret
    pub fn generated() -> Self {
        Self {
            secret: generate_secure_printable_jwt_secret(),
            expiration_minutes: 1440,
            issuer: "citywatch-server".to_string(),
            audience: "citywatch-clients".to_string(),
        }
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户邮箱 (Subject)
    pub sub: String,
    /// 签发时的角色
    pub role: Role,
    /// 令牌类型
    pub token_type: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

/// 生成可打印的安全 JWT 密钥 (用于开发环境)
pub fn generate_secure_printable_jwt_secret() -> String {
    const ALLOWED: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+";

    let rng = SystemRandom::new();
    let mut bytes = [0u8; 64];
    if rng.fill(&mut bytes).is_err() {
        // 如果随机数生成失败，使用固定的开发密钥
        return "CityWatchDevelopmentOnlySigningKey-NotForProduction".to_string();
    }

    bytes
        .iter()
        .map(|b| ALLOWED[(*b as usize) % ALLOWED.len()] as char)
        .collect()
}

/// Check a configured secret
pub fn validate_secret(secret: &str) -> Result<(), JwtError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(JwtError::ConfigError(format!(
            "JWT_SECRET must be at least {MIN_SECRET_LEN} characters long"
        )));
    }
    Ok(())
}

/// JWT 令牌服务
#[derive(Debug, Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// 使用指定配置创建新的 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户生成新令牌，返回 (token, 过期时间毫秒)
    pub fn generate_token(&self, email: &str, role: Role) -> Result<(String, i64), JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: email.to_string(),
            role,
            token_type: "access".to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))?;
        Ok((token, expiration.timestamp_millis()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// 由认证中间件创建，注入到请求处理函数。角色为签发时的快照；
/// 变更类接口会重新从数据库加载用户。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// 用户邮箱 (已规范化)
    pub email: String,
    /// 角色
    pub role: Role,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.sub,
            role: claims.role,
        }
    }
}

impl CurrentUser {
    /// 是否管理员
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Acting on own account, or admin
    pub fn is_self_or_admin(&self, email: &str) -> bool {
        self.is_admin() || self.email.eq_ignore_ascii_case(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            expiration_minutes: 60,
            issuer: "citywatch-test".to_string(),
            audience: "citywatch-test-clients".to_string(),
        })
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = service();
        let (token, expires_at) = service
            .generate_token("citizen@city.test", Role::Citizen)
            .expect("Failed to generate test token");

        let claims = service
            .validate_token(&token)
            .expect("Failed to validate test token");

        assert_eq!(claims.sub, "citizen@city.test");
        assert_eq!(claims.role, Role::Citizen);
        assert_eq!(claims.token_type, "access");
        assert_eq!(expires_at / 1000, claims.exp);
        assert!(claims.exp - claims.iat >= 3600);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let (token, _) = service()
            .generate_token("admin@city.test", Role::Admin)
            .unwrap();
        let other = JwtService::with_config(JwtConfig {
            secret: "a-completely-different-secret-of-enough-length".to_string(),
            ..service().config
        });
        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token() {
        let expired = JwtService::with_config(JwtConfig {
            expiration_minutes: -10,
            ..service().config
        });
        let (token, _) = expired
            .generate_token("citizen@city.test", Role::Citizen)
            .unwrap();
        assert!(matches!(
            expired.validate_token(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let (token, _) = service()
            .generate_token("citizen@city.test", Role::Citizen)
            .unwrap();
        let other = JwtService::with_config(JwtConfig {
            audience: "someone-else".to_string(),
            ..service().config
        });
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }

    #[test]
    fn test_generated_secret_is_long_enough() {
        let secret = generate_secure_printable_jwt_secret();
        assert!(validate_secret(&secret).is_ok());
        assert!(validate_secret("short").is_err());
    }

    #[test]
    fn test_current_user_scope() {
        let user = CurrentUser {
            email: "staff@city.test".into(),
            role: Role::Staff,
        };
        assert!(user.is_self_or_admin("STAFF@city.test"));
        assert!(!user.is_self_or_admin("other@city.test"));
    }
}
