//! Statistics API Module

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    let open_routes = Router::new()
        .route("/public-stats", get(handler::public))
        .route("/citizen/stats/{email}", get(handler::citizen))
        .route("/citizen/issues/{email}", get(handler::citizen_issues));

    let admin_routes = Router::new()
        .route("/admin/stats", get(handler::admin))
        .layer(middleware::from_fn(require_admin));

    open_routes.merge(admin_routes)
}
