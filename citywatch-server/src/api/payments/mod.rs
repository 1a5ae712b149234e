//! Payment API Module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/payments", get(handler::list).post(handler::record))
        .route(
            "/payments/{transaction_id}/invoice",
            get(handler::invoice),
        )
        .route("/create-payment-intent", post(handler::create_intent))
}
