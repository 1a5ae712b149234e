//! CityWatch Server - 市民问题上报后端
//!
//! # 架构概述
//!
//! - **数据库** (`db`): SQLite (sqlx) 连接池与仓储函数
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **支付** (`payments`): 支付意图 (Stripe REST / 开发环境模拟)
//! - **HTTP API** (`api`): RESTful API 接口，服务端重新执行角色门禁
//!
//! # 模块结构
//!
//! ```text
//! citywatch-server/src/
//! ├── core/          # 配置、状态、路由装配
//! ├── auth/          # JWT 认证、密码哈希
//! ├── api/           # HTTP 路由和处理器
//! ├── payments/      # 支付提供方
//! ├── utils/         # 日志、输入校验
//! └── db/            # 数据库层
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod payments;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState, build_app};
pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

// Audit logging macro - 生命周期变更 (issue id, actor, from/to)
#[macro_export]
macro_rules! audit_log {
    ($event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "audit",
            event = $event,
            $($key = $value),*
        );
    };
}

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
