//! Application state
//!
//! Holds all shared components and state

use crate::alert_log::AlertLog;
use crate::fall_monitor::FallMonitor;
use crate::frame_hub::FrameHub;
use crate::guardian_store::GuardianStore;
use crate::sms_client::SmsClient;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database URL
    pub database_url: String,
    /// Camera input: V4L2 device path, `rtsp://` URL, or video file
    pub camera_input: String,
    /// ONNX model path
    pub model_path: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Frame width fed to the detector and the stream
    pub frame_width: u32,
    /// Frame height fed to the detector and the stream
    pub frame_height: u32,
    /// Capture frame rate
    pub frame_rate: u32,
    /// Detection confidence threshold (also gates alerts)
    pub confidence: f32,
    /// NMS IoU threshold
    pub nms_threshold: f32,
    /// Class names in model output order
    pub class_names: Vec<String>,
    /// Name of the class that triggers an alert
    pub fall_class: String,
    /// Cooldown between alerts in seconds
    pub cooldown_sec: u64,
    /// SMS body sent to the guardian
    pub alert_message: String,
    /// Twilio account SID
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token
    pub twilio_auth_token: Option<String>,
    /// Twilio sender number
    pub twilio_from_number: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://fallwatch.db?mode=rwc".to_string()),
            camera_input: std::env::var("CAMERA_INPUT")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "models/fall.onnx".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            frame_width: std::env::var("FRAME_WIDTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(640),
            frame_height: std::env::var("FRAME_HEIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(360),
            frame_rate: std::env::var("FRAME_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            confidence: std::env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.85),
            nms_threshold: std::env::var("NMS_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.45),
            class_names: std::env::var("CLASS_NAMES")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| {
                    vec![
                        "walking".to_string(),
                        "falling".to_string(),
                        "sitting".to_string(),
                    ]
                }),
            fall_class: std::env::var("FALL_CLASS").unwrap_or_else(|_| "falling".to_string()),
            cooldown_sec: std::env::var("FALL_COOLDOWN_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            alert_message: std::env::var("ALERT_MESSAGE")
                .unwrap_or_else(|_| "Fall detected. Please check immediately.".to_string()),
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok(),
            twilio_from_number: std::env::var("TWILIO_FROM_NUMBER").ok(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub pool: SqlitePool,
    /// Application config
    pub config: AppConfig,
    /// GuardianStore (single alert contact)
    pub guardian: Arc<GuardianStore>,
    /// FrameHub (annotated frame distribution)
    pub frames: Arc<FrameHub>,
    /// AlertLog (recent alert events)
    pub alerts: Arc<AlertLog>,
    /// SmsClient (Twilio adapter)
    pub sms: Arc<SmsClient>,
    /// FallMonitor (alert decision state)
    pub monitor: Arc<FallMonitor>,
    /// Process start time, for uptime reporting
    pub started_at: Instant,
}
