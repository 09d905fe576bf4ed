//! HTTP API module
//!
//! The command channel between control surfaces and the timer authority.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/phase-complete", post(phase_complete_handler))
        .route("/switch", post(switch_handler))
        .route("/state", get(state_handler))
        .route("/status", get(status_handler))
        .route("/badge", get(badge_handler))
        .route("/navigation", post(navigation_handler))
        .route("/blocked", get(blocked_page_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
