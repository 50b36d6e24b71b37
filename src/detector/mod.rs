//! Detector - ONNX Posture Detection
//!
//! ## Responsibilities
//!
//! - Load the pre-trained posture model (ONNX) via ONNX Runtime
//! - Preprocess JPEG frames into the model input tensor
//! - Decode raw predictions into thresholded, NMS-filtered detections
//!
//! Inference is synchronous; callers run `detect` on the blocking thread
//! pool (see DetectionPipeline).

mod postprocess;

pub use postprocess::decode_predictions;

use crate::error::{Error, Result};
use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One detection in frame coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub class_id: usize,
    pub label: String,
    pub conf: f32,
}

/// Detector configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: String,
    /// Square model input edge (640 for the fall model)
    pub input_size: u32,
    pub confidence: f32,
    pub nms_threshold: f32,
    /// Class names in model output order
    pub class_names: Vec<String>,
}

/// Detector instance
pub struct Detector {
    /// Session::run needs exclusive access; the pipeline is the only caller
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl Detector {
    /// Load the model from disk
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.model_path)
            .map_err(|e| {
                Error::Inference(format!(
                    "Failed to load model {}: {}",
                    config.model_path, e
                ))
            })?;

        tracing::info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            confidence = config.confidence,
            classes = ?config.class_names,
            "Detection model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Run detection on a JPEG frame
    pub fn detect(&self, jpeg: &[u8]) -> Result<Vec<Detection>> {
        let image = image::load_from_memory(jpeg)?.to_rgb8();
        self.detect_image(&image)
    }

    /// Run detection on a decoded RGB frame
    pub fn detect_image(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let (frame_w, frame_h) = image.dimensions();

        let input = preprocess(image, self.config.input_size);
        let input_tensor =
            Tensor::from_array(input).map_err(|e| Error::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Internal("Detector session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs!["images" => input_tensor])
            .map_err(|e| Error::Inference(format!("Model run failed: {}", e)))?;

        let output: ndarray::ArrayViewD<f32> = outputs["output0"]
            .try_extract_array()
            .map_err(|e| Error::Inference(format!("Output extraction failed: {}", e)))?;

        Ok(decode_predictions(
            &output,
            &self.config.class_names,
            self.config.confidence,
            self.config.nms_threshold,
            self.config.input_size,
            frame_w,
            frame_h,
        ))
    }
}

/// Resize to the model input square and convert to a normalized
/// `[1, 3, size, size]` CHW tensor (RGB, scaled 1/255)
fn preprocess(image: &RgbImage, input_size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        input_size,
        input_size,
        image::imageops::FilterType::Triangle,
    );

    let size = input_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
        }
    }
    tensor
}
