//! Issue API Module
//!
//! Targeted transitions all use `PATCH /issues/{action}/{id}`.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/issues", routes())
}

fn routes() -> Router<ServerState> {
    // 读取路由公开; 其余接口在处理函数内通过 CurrentUser + 角色门禁校验
    let open_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::delete),
        )
        .route("/upvote/{id}", patch(handler::upvote))
        .route("/boost/{id}", patch(handler::boost))
        .route("/status/{id}", patch(handler::update_status));

    // 管理路由：仅管理员可用
    let manage_routes = Router::new()
        .route("/assign/{id}", patch(handler::assign))
        .layer(middleware::from_fn(require_admin));

    open_routes.merge(manage_routes)
}
