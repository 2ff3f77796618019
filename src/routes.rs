// routes.rs
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/polls", post(handlers::create_poll))
        .route(
            "/api/polls/{poll_id}",
            get(handlers::poll_snapshot).patch(handlers::update_poll),
        )
        .route(
            "/api/polls/{poll_id}/participants",
            post(handlers::join_poll),
        )
        .route(
            "/api/polls/{poll_id}/availability",
            post(handlers::submit_availability),
        )
        .route(
            "/api/polls/{poll_id}/availability/{availability_id}",
            delete(handlers::delete_availability),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
