//! Fallwatch - Webcam Fall-Detection Alert Server
//!
//! Main entry point.

use fallwatch::alert_log::AlertLog;
use fallwatch::camera_service::{CameraConfig, CameraService};
use fallwatch::detection_pipeline::DetectionPipeline;
use fallwatch::detector::{Detector, DetectorConfig};
use fallwatch::fall_monitor::{FallMonitor, FallPolicy};
use fallwatch::frame_hub::FrameHub;
use fallwatch::guardian_store::GuardianStore;
use fallwatch::sms_client::{SmsClient, SmsConfig};
use fallwatch::state::{AppConfig, AppState};
use fallwatch::web_api;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Model input edge for the fall model (640x640)
const MODEL_INPUT_SIZE: u32 = 640;

/// Capacity of the alert ring buffer
const ALERT_LOG_CAPACITY: usize = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fallwatch=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fallwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        camera_input = %config.camera_input,
        model_path = %config.model_path,
        confidence = config.confidence,
        cooldown_sec = config.cooldown_sec,
        fall_class = %config.fall_class,
        "Configuration loaded"
    );

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Database connected");

    // Check ffmpeg availability up front
    match CameraService::check_ffmpeg().await {
        Ok(version) => tracing::info!(version = %version, "ffmpeg available"),
        Err(e) => tracing::warn!(error = %e, "ffmpeg not available, camera capture will fail"),
    }

    // Initialize components
    let guardian = Arc::new(GuardianStore::new(pool.clone()).await?);

    let alerts = Arc::new(AlertLog::new(pool.clone(), ALERT_LOG_CAPACITY).await?);
    tracing::info!("AlertLog initialized");

    let sms = Arc::new(SmsClient::new(SmsConfig {
        account_sid: config.twilio_account_sid.clone(),
        auth_token: config.twilio_auth_token.clone(),
        from_number: config.twilio_from_number.clone(),
    }));
    if sms.is_configured() {
        tracing::info!("SmsClient initialized (Twilio configured)");
    } else {
        tracing::warn!("SmsClient running without Twilio credentials, alerts will not be delivered");
    }

    let frames = Arc::new(FrameHub::new());

    let monitor = Arc::new(FallMonitor::new(
        guardian.clone(),
        sms.clone(),
        alerts.clone(),
        FallPolicy {
            fall_class: config.fall_class.clone(),
            confidence: config.confidence,
            cooldown: Duration::from_secs(config.cooldown_sec),
            alert_message: config.alert_message.clone(),
        },
    ));
    tracing::info!("FallMonitor initialized");

    // Load the detection model off the runtime threads
    let detector_config = DetectorConfig {
        model_path: config.model_path.clone(),
        input_size: MODEL_INPUT_SIZE,
        confidence: config.confidence,
        nms_threshold: config.nms_threshold,
        class_names: config.class_names.clone(),
    };
    let detector = Arc::new(
        tokio::task::spawn_blocking(move || Detector::new(detector_config)).await??,
    );

    // Start camera capture and the detection pipeline
    let camera = CameraService::new(CameraConfig {
        input: config.camera_input.clone(),
        width: config.frame_width,
        height: config.frame_height,
        frame_rate: config.frame_rate,
    });
    let camera_rx = camera.start();

    let pipeline = DetectionPipeline::new(detector, frames.clone(), monitor.clone());
    pipeline.start(camera_rx);

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
        guardian,
        frames,
        alerts,
        sms,
        monitor,
        started_at: Instant::now(),
    };

    // Build router with middleware
    let app = web_api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Fallwatch listening");

    axum::serve(listener, app).await?;

    Ok(())
}
