//! Auth API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /jwt | POST | 以身份提供方验证过的邮箱换取令牌 (市民) |
//! | /auth/login | POST | 工作人员 / 管理员密码登录 |
//! | /auth/me | GET | 当前账号 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/jwt", post(handler::issue_token))
        .route("/auth/login", post(handler::login))
        .route("/auth/me", get(handler::me))
}
