//! DetectionPipeline - Frame Loop
//!
//! ## Responsibilities
//!
//! - Drive frame -> detect -> overlay -> publish -> alert decision
//! - Keep the loop alive across per-frame failures
//!
//! Inference and re-encoding are CPU-bound and run via `spawn_blocking` so
//! the web server stays responsive.

use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::fall_monitor::FallMonitor;
use crate::frame_hub::FrameHub;
use crate::overlay;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// DetectionPipeline instance
pub struct DetectionPipeline {
    detector: Arc<Detector>,
    frames: Arc<FrameHub>,
    monitor: Arc<FallMonitor>,
}

impl DetectionPipeline {
    /// Create new DetectionPipeline
    pub fn new(detector: Arc<Detector>, frames: Arc<FrameHub>, monitor: Arc<FallMonitor>) -> Self {
        Self {
            detector,
            frames,
            monitor,
        }
    }

    /// Consume camera frames until the camera stream ends
    pub fn start(self, mut camera_rx: mpsc::Receiver<Bytes>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Detection pipeline started");
            let mut frame_count = 0u64;

            while let Some(frame) = camera_rx.recv().await {
                frame_count += 1;

                if let Err(e) = self.process_frame(frame).await {
                    tracing::warn!(
                        frame = frame_count,
                        error = %e,
                        "Frame processing failed"
                    );
                }

                if frame_count % 500 == 0 {
                    tracing::debug!(
                        frames = frame_count,
                        viewers = self.frames.viewer_count(),
                        "Pipeline heartbeat"
                    );
                }
            }

            tracing::info!(frames = frame_count, "Detection pipeline stopped");
        })
    }

    /// Run one frame through detection, overlay, publish and alerting
    async fn process_frame(&self, jpeg: Bytes) -> Result<()> {
        let detector = self.detector.clone();
        let detect_input = jpeg.clone();
        let detections = tokio::task::spawn_blocking(move || detector.detect(&detect_input))
            .await
            .map_err(|e| Error::Internal(format!("Detection task panicked: {}", e)))??;

        for det in &detections {
            tracing::debug!(
                label = %det.label,
                conf = det.conf,
                x1 = det.x1,
                y1 = det.y1,
                "Detection"
            );
        }

        let annotated = if detections.is_empty() {
            jpeg
        } else {
            let overlay_input = jpeg.clone();
            let overlay_dets = detections.clone();
            let encoded = tokio::task::spawn_blocking(move || {
                overlay::annotate_jpeg(&overlay_input, &overlay_dets)
            })
            .await
            .map_err(|e| Error::Internal(format!("Overlay task panicked: {}", e)))??;
            Bytes::from(encoded)
        };

        self.frames.publish(annotated);
        self.monitor.observe(&detections).await?;

        Ok(())
    }
}
