//! User API Module

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/users", routes())
}

fn routes() -> Router<ServerState> {
    // 注册与角色查询公开; 个人资料在处理函数内校验本人或管理员
    let open_routes = Router::new()
        .route("/", axum::routing::post(handler::register))
        .route("/role/{email}", get(handler::role))
        .route("/{email}", get(handler::get_by_email).put(handler::update))
        .route("/premium/{email}", patch(handler::premium));

    // 管理路由：仅管理员可用
    let manage_routes = Router::new()
        .route("/", get(handler::list))
        .route("/block/{email}", patch(handler::block))
        .layer(middleware::from_fn(require_admin));

    open_routes.merge(manage_routes)
}
