//! 服务器状态
//!
//! 所有请求处理函数共享的状态，克隆开销为几个 `Arc`。

use std::sync::Arc;

use shared::GatePolicy;
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

use crate::auth::{JwtService, hash_password};
use crate::core::Config;
use crate::db::{DbService, repository::user};
use crate::payments::{PaymentProvider, SimulatedProvider, StripeProvider};
use crate::utils::validation::{validate_email, validate_password};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Arc<Config>,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 服务
    pub jwt_service: Arc<JwtService>,
    /// 支付提供方
    pub payments: Arc<dyn PaymentProvider>,
    /// 角色门禁参数
    pub gate: GatePolicy,
}

impl ServerState {
    /// 初始化: 打开数据库、运行迁移、选择支付提供方、创建管理员种子账号
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let db = DbService::new(&config.database_url).await?;

        let payments: Arc<dyn PaymentProvider> = match &config.payment_secret_key {
            Some(key) => Arc::new(StripeProvider::new(
                key.clone(),
                config.payment_api_base.clone(),
            )),
            None => {
                tracing::warn!("PAYMENT_SECRET_KEY not set, using simulated payments");
                Arc::new(SimulatedProvider::new())
            }
        };

        let state = Self::new(config.clone(), db.pool, payments);
        state.seed_admin().await?;

        tracing::info!(
            payments = state.payments.name(),
            free_tier_limit = state.gate.free_tier_issue_limit,
            "Server state initialized"
        );
        Ok(state)
    }

    /// 手动构造 (测试中注入自定义支付提供方)
    pub fn new(config: Config, pool: SqlitePool, payments: Arc<dyn PaymentProvider>) -> Self {
        Self {
            gate: GatePolicy::new(config.free_tier_issue_limit),
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            config: Arc::new(config),
            pool,
            payments,
        }
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    async fn seed_admin(&self) -> AppResult<()> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password)
        else {
            return Ok(());
        };
        validate_email(email)?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        let admin = user::upsert_admin(&self.pool, snowflake_id(), email, &hash, now_millis())
            .await
            .map_err(AppError::from)?;
        tracing::info!(email = %admin.email, "Admin account ready");
        Ok(())
    }
}
