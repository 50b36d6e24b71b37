//! WebApi - HTTP Endpoints
//!
//! ## Responsibilities
//!
//! - HTML pages (live view, guardian setup form)
//! - MJPEG video feed
//! - JSON API (guardian, alerts, health)

mod pages;
mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .is_ok();

    let policy = state.monitor.policy();
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        camera_streaming: state.frames.is_live(),
        sms_configured: state.sms.is_configured(),
        guardian_configured: state.guardian.is_configured().await,
        db_connected: db_ok,
        fall_class: policy.fall_class.clone(),
        cooldown_remaining_sec: state
            .monitor
            .cooldown_remaining()
            .await
            .map(|d| d.as_secs()),
    };

    Json(response)
}
