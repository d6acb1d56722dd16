use axum::{routing::get, Router};

use crate::{
    controllers::{events_controller, health_controller},
    AppState,
};

pub fn app(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_controller::health))
        .route("/health/db", get(health_controller::health_db))
        .route("/events", get(events_controller::sse_events))
        .fallback(health_controller::not_found)
        .with_state(state)
}
