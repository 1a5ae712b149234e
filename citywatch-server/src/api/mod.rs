//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 令牌签发与密码登录
//! - [`issues`] - 问题上报与状态流转
//! - [`users`] - 市民账号
//! - [`staff`] - 工作人员管理
//! - [`payments`] - 支付记录与支付意图
//! - [`stats`] - 统计
//!
//! 每个变更类接口都会重新加载记录并执行角色门禁 (`shared::policy`)。

pub mod access;

pub mod auth;
pub mod health;
pub mod issues;
pub mod payments;
pub mod staff;
pub mod stats;
pub mod users;

use axum::Router;

use crate::core::ServerState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Public
        .merge(health::router())
        .merge(auth::router())
        // Domain
        .merge(issues::router())
        .merge(users::router())
        .merge(staff::router())
        .merge(payments::router())
        .merge(stats::router())
}
