//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{services::Badge, state::TimerState};

/// API response structure for command endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub state: TimerState,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, state: TimerState) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            state,
        }
    }

    /// Status derived from whether the timer is running
    pub fn for_state(message: String, state: TimerState) -> Self {
        let status = if state.is_running { "running" } else { "idle" };
        Self::new(status.to_string(), message, state)
    }
}

/// Daemon status with timer, blocking and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: TimerState,
    pub blocking_active: bool,
    pub installed_rules: usize,
    pub blocked_domains: usize,
    pub badge: Badge,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
