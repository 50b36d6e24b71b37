//! Fallwatch Library
//!
//! Webcam fall-detection alert server
//!
//! ## Architecture (9 Components)
//!
//! 1. CameraService - Frame acquisition from the webcam (ffmpeg MJPEG pipe)
//! 2. Detector - ONNX posture detection (walking / falling / sitting)
//! 3. Overlay - Bounding box rendering onto frames
//! 4. FrameHub - Annotated frame distribution to MJPEG viewers
//! 5. FallMonitor - Detection-to-alert decision (threshold + cooldown)
//! 6. GuardianStore - Single guardian contact record (SQLite)
//! 7. SmsClient - Twilio REST adapter
//! 8. AlertLog - Alert event recording (ring buffer + SQLite)
//! 9. WebApi - HTTP routes (pages, video feed, JSON API)
//!
//! ## Design Principles
//!
//! - GuardianStore is the single source of truth for the alert contact
//! - Single responsibility per module
//! - The frame loop never takes the process down; per-frame errors are
//!   logged and the loop continues

pub mod alert_log;
pub mod camera_service;
pub mod detection_pipeline;
pub mod detector;
pub mod error;
pub mod fall_monitor;
pub mod frame_hub;
pub mod guardian_store;
pub mod models;
pub mod overlay;
pub mod sms_client;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
