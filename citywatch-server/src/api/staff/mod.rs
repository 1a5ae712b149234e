//! Staff API Module
//!
//! `{staff}` is the numeric id for update / delete and the email for the
//! per-staff listings.

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/staff", routes())
}

fn routes() -> Router<ServerState> {
    // 本人或管理员 (在处理函数内校验)
    let self_routes = Router::new()
        .route("/{staff}", axum::routing::patch(handler::update))
        .route("/email/{email}", get(handler::get_by_email))
        .route("/{staff}/issues", get(handler::assigned_issues))
        .route("/{staff}/stats", get(handler::stats));

    // 管理路由：仅管理员可用
    let manage_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{staff}", delete(handler::delete))
        .layer(middleware::from_fn(require_admin));

    self_routes.merge(manage_routes)
}
