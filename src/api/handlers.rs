//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    blocking::{BlockPage, NavigationEvent, NavigationVerdict},
    error::GuardError,
    services::Badge,
    state::{AppState, StartRequest, TimerState},
};
use super::responses::{ApiResponse, HealthResponse, StatusResponse};

fn internal_error(context: &str, e: GuardError) -> StatusCode {
    error!("{}: {}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Handle POST /start - Begin a work phase
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    // Reject bad durations before touching the authority
    if let Err(e) = request.durations() {
        warn!("Rejected start request: {}", e);
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.apply("start", |authority| authority.start(&request)) {
        Ok(Ok(timer)) => {
            info!("Start endpoint called");
            Ok(Json(ApiResponse::for_state("Timer running".to_string(), timer)))
        }
        Ok(Err(e)) => {
            warn!("Rejected start request: {}", e);
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => Err(internal_error("Failed to start timer", e)),
    }
}

/// Handle POST /stop - Idle and reset to the full duration
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state
        .apply("stop", |authority| authority.stop())
        .map_err(|e| internal_error("Failed to stop timer", e))?;

    info!("Stop endpoint called");
    Ok(Json(ApiResponse::for_state("Timer stopped".to_string(), timer)))
}

/// Handle POST /phase-complete - A control surface reports the phase as finished
pub async fn phase_complete_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state
        .apply("phase-complete", |authority| authority.complete_phase())
        .map_err(|e| internal_error("Failed to complete phase", e))?;

    Ok(Json(ApiResponse::for_state("Phase completed".to_string(), timer)))
}

/// Handle POST /switch - Manual phase switch for debugging
pub async fn switch_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let timer = state
        .apply("switch", |authority| authority.complete_phase())
        .map_err(|e| internal_error("Failed to switch phase", e))?;

    info!("Switch endpoint called, now in {} phase", timer.phase.as_str());
    Ok(Json(ApiResponse::for_state("Phase switched".to_string(), timer)))
}

/// Handle GET /state - Live timer state
pub async fn state_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerState>, StatusCode> {
    state
        .read(|authority| authority.state())
        .map(Json)
        .map_err(|e| internal_error("Failed to read timer state", e))
}

/// Handle GET /status - Timer, blocking and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let (timer, blocking_active, installed_rules, blocked_domains) = state
        .read(|authority| {
            let installed = match authority.rules().installed() {
                Ok(rules) => rules.len(),
                Err(e) => {
                    warn!("Failed to list installed rules: {}", e);
                    0
                }
            };
            (
                authority.state(),
                authority.blocking_active(),
                installed,
                authority.rules().domains().len(),
            )
        })
        .map_err(|e| internal_error("Failed to read timer state", e))?;

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        state: timer,
        blocking_active,
        installed_rules,
        blocked_domains,
        badge: state.badge(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /badge - Countdown indicator
pub async fn badge_handler(State(state): State<Arc<AppState>>) -> Json<Badge> {
    Json(state.badge())
}

/// Handle POST /navigation - Live check of a tab navigation
pub async fn navigation_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<NavigationEvent>,
) -> Result<Json<NavigationVerdict>, StatusCode> {
    let (blocking_active, remaining) = state
        .read(|authority| (authority.blocking_active(), authority.remaining_seconds()))
        .map_err(|e| internal_error("Failed to read timer state", e))?;

    Ok(Json(state.navigation.verdict(&event, blocking_active, remaining)))
}

#[derive(Debug, Deserialize)]
pub struct BlockedQuery {
    pub host: Option<String>,
}

/// Handle GET /blocked - Block page target for redirect rules
pub async fn blocked_page_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BlockedQuery>,
) -> Result<Html<String>, StatusCode> {
    let remaining = state
        .read(|authority| authority.remaining_seconds())
        .map_err(|e| internal_error("Failed to read timer state", e))?;
    let host = query.host.unwrap_or_else(|| "this site".to_string());

    Ok(Html(BlockPage::new(host, remaining).render()))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
