//! Shared data models

use serde::{Deserialize, Serialize};

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub camera_streaming: bool,
    pub sms_configured: bool,
    pub guardian_configured: bool,
    pub db_connected: bool,
    /// Class label that triggers an alert
    pub fall_class: String,
    /// Seconds left in the alert cooldown, null when none is active
    pub cooldown_remaining_sec: Option<u64>,
}
