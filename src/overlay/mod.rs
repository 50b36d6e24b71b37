//! Overlay - Bounding Box Rendering
//!
//! ## Responsibilities
//!
//! - Draw per-class colored boxes for each detection onto the frame
//! - Caption each box with the label and confidence
//! - Re-encode the annotated frame as JPEG for the video feed
//!
//! Captions use a built-in 5x7 pixel font (uppercase, digits, dot) so no
//! font file has to ship with the binary.

use crate::detector::Detection;
use crate::error::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Box line thickness in pixels
const BOX_THICKNESS: i32 = 2;
/// JPEG quality for the re-encoded stream frames
const JPEG_QUALITY: u8 = 80;

/// Per-class box colors: walking blue, falling red, sitting green
const CLASS_COLORS: [[u8; 3]; 3] = [[0, 0, 255], [255, 0, 0], [0, 255, 0]];
/// Fallback color for unknown classes
const DEFAULT_COLOR: [u8; 3] = [255, 255, 255];

/// Glyph cell width in font pixels
const GLYPH_W: i32 = 5;
/// Glyph cell height in font pixels
const GLYPH_H: i32 = 7;
/// Screen pixels per font pixel
const TEXT_SCALE: i32 = 2;
/// Caption band height, including a small margin below
const CAPTION_HEIGHT: i32 = GLYPH_H * TEXT_SCALE + 2;

/// Color for a class id
pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(*CLASS_COLORS.get(class_id).unwrap_or(&DEFAULT_COLOR))
}

/// Draw detections onto a decoded frame
pub fn draw_detections(image: &mut RgbImage, detections: &[Detection]) {
    for det in detections {
        let color = class_color(det.class_id);

        let x1 = det.x1.round() as i32;
        let y1 = det.y1.round() as i32;
        let w = (det.x2 - det.x1).round().max(1.0) as u32;
        let h = (det.y2 - det.y1).round().max(1.0) as u32;

        for i in 0..BOX_THICKNESS {
            let rect = Rect::at(x1 + i, y1 + i);
            let rw = w.saturating_sub(2 * i as u32);
            let rh = h.saturating_sub(2 * i as u32);
            if rw == 0 || rh == 0 {
                break;
            }
            draw_hollow_rect_mut(image, rect.of_size(rw, rh), color);
        }

        // Caption above the box, or inside its top edge near the frame top
        let caption = format!("{} {:.2}", det.label, det.conf);
        let text_y = if y1 - CAPTION_HEIGHT >= 0 {
            y1 - CAPTION_HEIGHT
        } else {
            y1 + BOX_THICKNESS + 2
        };
        draw_text(image, &caption, x1, text_y, color);
    }
}

/// Decode a JPEG frame, draw detections, re-encode to JPEG.
///
/// Frames with no detections are passed through untouched to spare the
/// decode/encode round trip.
pub fn annotate_jpeg(jpeg: &[u8], detections: &[Detection]) -> Result<Vec<u8>> {
    if detections.is_empty() {
        return Ok(jpeg.to_vec());
    }

    let mut image = image::load_from_memory(jpeg)?.to_rgb8();
    draw_detections(&mut image, detections);

    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    image.write_with_encoder(encoder)?;
    Ok(out)
}

/// Draw text with the built-in font, clipped to the frame.
///
/// Characters are uppercased; ones outside the glyph set render blank.
fn draw_text(image: &mut RgbImage, text: &str, x: i32, y: i32, color: Rgb<u8>) {
    let (frame_w, frame_h) = image.dimensions();
    let mut cell_x = x;

    for c in text.chars() {
        if let Some(rows) = glyph(c.to_ascii_uppercase()) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_W {
                    if bits & (0x10 >> col) == 0 {
                        continue;
                    }
                    for dy in 0..TEXT_SCALE {
                        for dx in 0..TEXT_SCALE {
                            let px = cell_x + col * TEXT_SCALE + dx;
                            let py = y + row as i32 * TEXT_SCALE + dy;
                            if px >= 0
                                && py >= 0
                                && (px as u32) < frame_w
                                && (py as u32) < frame_h
                            {
                                image.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
        cell_x += (GLYPH_W + 1) * TEXT_SCALE;
    }
}

/// 5x7 glyph rows, 5 low bits per row, bit 4 leftmost
fn glyph(c: char) -> Option<&'static [u8; 7]> {
    let rows: &[u8; 7] = match c {
        'A' => &[0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => &[0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => &[0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => &[0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => &[0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => &[0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => &[0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => &[0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => &[0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => &[0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => &[0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => &[0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => &[0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => &[0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11],
        'O' => &[0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => &[0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => &[0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => &[0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => &[0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => &[0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => &[0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => &[0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => &[0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => &[0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => &[0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => &[0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => &[0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => &[0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => &[0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => &[0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => &[0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => &[0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => &[0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => &[0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => &[0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => &[0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => &[0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(class_id: usize) -> Detection {
        Detection {
            x1: 10.0,
            y1: 10.0,
            x2: 30.0,
            y2: 40.0,
            class_id,
            label: "falling".to_string(),
            conf: 0.9,
        }
    }

    #[test]
    fn test_class_colors() {
        assert_eq!(class_color(0), Rgb([0, 0, 255]));
        assert_eq!(class_color(1), Rgb([255, 0, 0]));
        assert_eq!(class_color(2), Rgb([0, 255, 0]));
        assert_eq!(class_color(99), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_draw_marks_box_edges() {
        let mut image = RgbImage::new(64, 64);
        draw_detections(&mut image, &[detection(1)]);

        // Top-left corner of the box carries the falling color
        assert_eq!(*image.get_pixel(10, 10), Rgb([255, 0, 0]));
        // Pixel inside the box, below the caption band, stays untouched
        assert_eq!(*image.get_pixel(14, 34), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_caption_drawn_inside_box_near_frame_top() {
        let mut image = RgbImage::new(64, 64);
        draw_detections(&mut image, &[detection(1)]);

        // No room above y1=10, so the caption starts at the box top inset.
        // (12, 14) is off the box outline and on the top row of the F glyph.
        assert_eq!(*image.get_pixel(12, 14), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_caption_drawn_above_box_when_room() {
        let mut image = RgbImage::new(64, 64);
        let mut det = detection(1);
        det.y1 = 30.0;
        det.y2 = 50.0;
        draw_detections(&mut image, &[det]);

        assert_eq!(
            *image.get_pixel(10, (30 - CAPTION_HEIGHT) as u32),
            Rgb([255, 0, 0])
        );
    }

    #[test]
    fn test_unknown_glyphs_render_blank() {
        let mut image = RgbImage::new(32, 32);
        draw_text(&mut image, "~~~", 0, 0, Rgb([255, 255, 255]));
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_text_clipped_at_frame_edge() {
        let mut image = RgbImage::new(16, 16);
        // Runs well past the right edge without panicking
        draw_text(&mut image, "FALLING 0.90", 4, 4, Rgb([255, 0, 0]));
        assert_eq!(*image.get_pixel(4, 4), Rgb([255, 0, 0]));
    }

    #[test]
    fn test_annotate_passthrough_without_detections() {
        let jpeg = encode_test_jpeg();
        let out = annotate_jpeg(&jpeg, &[]).unwrap();
        assert_eq!(out, jpeg);
    }

    #[test]
    fn test_annotate_produces_valid_jpeg() {
        let jpeg = encode_test_jpeg();
        let out = annotate_jpeg(&jpeg, &[detection(1)]).unwrap();
        assert!(image::load_from_memory(&out).is_ok());
    }

    fn encode_test_jpeg() -> Vec<u8> {
        let image = RgbImage::new(64, 64);
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 80);
        image.write_with_encoder(encoder).unwrap();
        buf
    }
}
