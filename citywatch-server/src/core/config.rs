use shared::models::PriorityScale;
use thiserror::Error;

use crate::auth::jwt::{JwtConfig, generate_secure_printable_jwt_secret, validate_secret};

/// Configuration errors (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in {1} environment")]
    MissingSecret(&'static str, String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error(transparent)]
    Jwt(#[from] crate::auth::JwtError),
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | DATABASE_URL | sqlite:citywatch.db | SQLite 数据库 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 日志输出 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | JWT_SECRET | 开发环境自动生成 | 至少 32 字符 |
/// | JWT_EXPIRATION_MINUTES | 1440 | 令牌有效期 |
/// | JWT_ISSUER | citywatch-server | 签发者 |
/// | JWT_AUDIENCE | citywatch-clients | 受众 |
/// | PAYMENT_SECRET_KEY | - | 支付密钥，未设置时使用模拟支付 (仅开发环境) |
/// | PAYMENT_API_BASE | https://api.stripe.com/v1 | 支付接口地址 |
/// | BOOST_PRICE | 100 | 加急价格 |
/// | SUBSCRIPTION_PRICE | 1000 | 高级会员价格 |
/// | FREE_TIER_ISSUE_LIMIT | 3 | 免费用户上报上限 |
/// | PRIORITY_SCALE | binary | 优先级过滤刻度 (binary / extended) |
/// | CORS_ALLOW_ORIGIN | - | 允许的来源，未设置时放行所有 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | ADMIN_EMAIL / ADMIN_PASSWORD | - | 启动时创建管理员账号 |
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// SQLite 连接 URL
    pub database_url: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 支付提供方密钥
    pub payment_secret_key: Option<String>,
    pub payment_api_base: String,
    pub boost_price: f64,
    pub subscription_price: f64,
    pub free_tier_issue_limit: usize,
    pub priority_scale: PriorityScale,
    pub cors_allow_origin: Option<String>,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 管理员种子账号
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let is_development = environment == "development";

        let secret = match var("JWT_SECRET") {
            Some(secret) => {
                validate_secret(&secret)?;
                secret
            }
            None if is_development => {
                tracing::warn!("JWT_SECRET not set! Generating temporary key for development.");
                generate_secure_printable_jwt_secret()
            }
            None => return Err(ConfigError::MissingSecret("JWT_SECRET", environment)),
        };

        let payment_secret_key = var("PAYMENT_SECRET_KEY");
        if payment_secret_key.is_none() && !is_development {
            return Err(ConfigError::MissingSecret("PAYMENT_SECRET_KEY", environment));
        }

        let priority_scale = match var("PRIORITY_SCALE") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PRIORITY_SCALE",
                value,
            })?,
            None => PriorityScale::default(),
        };

        Ok(Self {
            http_port: parse_or(var("HTTP_PORT"), 3000),
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite:citywatch.db".into()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_or(var("LOG_JSON"), false),
            log_dir: var("LOG_DIR"),
            jwt: JwtConfig {
                secret,
                expiration_minutes: parse_or(var("JWT_EXPIRATION_MINUTES"), 1440), // 默认 24 小时
                issuer: var("JWT_ISSUER").unwrap_or_else(|| "citywatch-server".into()),
                audience: var("JWT_AUDIENCE").unwrap_or_else(|| "citywatch-clients".into()),
            },
            payment_secret_key,
            payment_api_base: var("PAYMENT_API_BASE")
                .unwrap_or_else(|| crate::payments::DEFAULT_API_BASE.into()),
            boost_price: parse_or(var("BOOST_PRICE"), 100.0),
            subscription_price: parse_or(var("SUBSCRIPTION_PRICE"), 1000.0),
            free_tier_issue_limit: parse_or(
                var("FREE_TIER_ISSUE_LIMIT"),
                shared::policy::FREE_TIER_ISSUE_LIMIT,
            ),
            priority_scale,
            cors_allow_origin: var("CORS_ALLOW_ORIGIN"),
            request_timeout_ms: parse_or(var("REQUEST_TIMEOUT_MS"), 30_000),
            admin_email: var("ADMIN_EMAIL").map(|e| shared::util::normalize_email(&e)),
            admin_password: var("ADMIN_PASSWORD"),
            environment,
        })
    }

    /// In-memory database, generated secret, simulated payments
    pub fn for_tests() -> Self {
        Self {
            http_port: 0,
            database_url: "sqlite::memory:".into(),
            environment: "development".into(),
            log_level: "debug".into(),
            log_json: false,
            log_dir: None,
            jwt: JwtConfig::generated(),
            payment_secret_key: None,
            payment_api_base: crate::payments::DEFAULT_API_BASE.into(),
            boost_price: 100.0,
            subscription_price: 1000.0,
            free_tier_issue_limit: shared::policy::FREE_TIER_ISSUE_LIMIT,
            priority_scale: PriorityScale::Binary,
            cors_allow_origin: None,
            request_timeout_ms: 30_000,
            admin_email: None,
            admin_password: None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Expected charge for a purpose
    pub fn price_for(&self, purpose: shared::models::PaymentPurpose) -> f64 {
        match purpose {
            shared::models::PaymentPurpose::Boost => self.boost_price,
            shared::models::PaymentPurpose::Subscription => self.subscription_price,
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_in_development() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.database_url, "sqlite:citywatch.db");
        assert!(config.is_development());
        assert_eq!(config.jwt.expiration_minutes, 1440);
        assert!(config.jwt.secret.len() >= 32);
        assert_eq!(config.boost_price, 100.0);
        assert_eq!(config.subscription_price, 1000.0);
        assert_eq!(config.free_tier_issue_limit, 3);
        assert_eq!(config.priority_scale, PriorityScale::Binary);
        assert!(config.payment_secret_key.is_none());
        assert_eq!(config.payment_api_base, "https://api.stripe.com/v1");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HTTP_PORT", "8088"),
            ("PRIORITY_SCALE", "extended"),
            ("FREE_TIER_ISSUE_LIMIT", "5"),
            ("LOG_JSON", "true"),
            ("ADMIN_EMAIL", " Admin@City.Test "),
            ("HTTP_PORT_IGNORED", "x"),
        ]))
        .unwrap();
        assert_eq!(config.http_port, 8088);
        assert_eq!(config.priority_scale, PriorityScale::Extended);
        assert_eq!(config.free_tier_issue_limit, 5);
        assert!(config.log_json);
        assert_eq!(config.admin_email.as_deref(), Some("admin@city.test"));
    }

    #[test]
    fn test_unparseable_number_falls_back() {
        let config = Config::from_lookup(lookup(&[("BOOST_PRICE", "lots")])).unwrap();
        assert_eq!(config.boost_price, 100.0);
    }

    #[test]
    fn test_bad_priority_scale_is_rejected() {
        let err = Config::from_lookup(lookup(&[("PRIORITY_SCALE", "fivefold")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "PRIORITY_SCALE", .. }));
    }

    #[test]
    fn test_production_requires_secrets() {
        let err = Config::from_lookup(lookup(&[("ENVIRONMENT", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("JWT_SECRET", _)));

        let err = Config::from_lookup(lookup(&[
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("PAYMENT_SECRET_KEY", _)));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "short")])).is_err());
    }
}
