//! YOLO output decoding
//!
//! The model emits `[1, 4 + num_classes, N]`: box center/size rows followed
//! by one score row per class, N anchors. Decoding picks the best class per
//! anchor, applies the confidence threshold, scales boxes back to frame
//! coordinates and runs class-aware NMS.

use super::Detection;
use ndarray::ArrayViewD;

/// Decode raw model output into final detections
pub fn decode_predictions(
    output: &ArrayViewD<f32>,
    class_names: &[String],
    conf_threshold: f32,
    nms_threshold: f32,
    input_size: u32,
    frame_w: u32,
    frame_h: u32,
) -> Vec<Detection> {
    let shape = output.shape();
    if shape.len() != 3 || shape[1] < 5 {
        tracing::warn!(?shape, "Unexpected model output shape");
        return Vec::new();
    }

    let num_classes = shape[1] - 4;
    let num_anchors = shape[2];

    let sx = frame_w as f32 / input_size as f32;
    let sy = frame_h as f32 / input_size as f32;

    let mut candidates = Vec::new();
    for i in 0..num_anchors {
        let mut best_class = 0usize;
        let mut best_score = 0f32;
        for c in 0..num_classes {
            let score = output[[0, 4 + c, i]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < conf_threshold {
            continue;
        }

        let cx = output[[0, 0, i]];
        let cy = output[[0, 1, i]];
        let w = output[[0, 2, i]];
        let h = output[[0, 3, i]];

        let label = class_names
            .get(best_class)
            .cloned()
            .unwrap_or_else(|| format!("class{}", best_class));

        candidates.push(Detection {
            x1: ((cx - w / 2.0) * sx).clamp(0.0, frame_w as f32),
            y1: ((cy - h / 2.0) * sy).clamp(0.0, frame_h as f32),
            x2: ((cx + w / 2.0) * sx).clamp(0.0, frame_w as f32),
            y2: ((cy + h / 2.0) * sy).clamp(0.0, frame_h as f32),
            class_id: best_class,
            label,
            conf: best_score,
        });
    }

    non_max_suppression(candidates, nms_threshold)
}

/// Class-aware non-maximum suppression
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.conf.total_cmp(&a.conf));

    let mut kept: Vec<Detection> = Vec::new();
    for det in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == det.class_id && iou(k, &det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

/// Intersection-over-union of two boxes
fn iou(a: &Detection, b: &Detection) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);

    inter / (area_a + area_b - inter)
}
