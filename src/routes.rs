// src/routes.rs
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/create",
            get(handlers::create_form).post(handlers::create_poll),
        )
        .route("/poll/{poll_id}", get(handlers::view_poll))
        .route("/vote/{poll_id}", post(handlers::vote))
        .route("/poll/{poll_id}/results", get(handlers::results))
        .route("/poll/{poll_id}/close", post(handlers::close_poll))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
