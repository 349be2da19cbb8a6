//! Diagnostic overlay rendering
//!
//! Draws detection results onto a copy of a frame for operator inspection.
//! Never mutates the input frame.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut,
};
use imageproc::rect::Rect;

use super::detector::Detection;
use super::VisionError;

const LABEL_HEIGHT: i32 = 16;
const LABEL_SCALE: f32 = 14.0;

/// Renders detection boxes, center markers and labels.
pub struct Overlay {
    font: Option<FontVec>,
    show_confidence: bool,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    /// Overlay without text rendering; labels are color-coded tags.
    pub fn new() -> Self {
        Self {
            font: None,
            show_confidence: true,
        }
    }

    /// Enable text labels using a TTF/OTF font file.
    pub fn with_font_file(mut self, path: &std::path::Path) -> Result<Self, VisionError> {
        let bytes = std::fs::read(path)
            .map_err(|e| VisionError::FontLoad(format!("{}: {e}", path.display())))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| VisionError::FontLoad(format!("{}: {e}", path.display())))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn show_confidence(mut self, show: bool) -> Self {
        self.show_confidence = show;
        self
    }

    /// Render detections onto a copy of `frame`.
    pub fn draw(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = frame.clone();

        for det in detections {
            let (x1, y1, x2, y2) = det.bbox;
            let color = class_color(det.class_id);
            // Corners are inclusive
            let width = (x2 - x1 + 1).max(1) as u32;
            let height = (y2 - y1 + 1).max(1) as u32;

            // 2px box outline
            draw_hollow_rect_mut(&mut canvas, Rect::at(x1, y1).of_size(width, height), color);
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x1 + 1, y1 + 1).of_size(width.saturating_sub(2).max(1), height.saturating_sub(2).max(1)),
                color,
            );

            draw_filled_circle_mut(&mut canvas, det.center, 4, color);

            // Label tag above the box, inside the frame when the box touches
            // the top edge
            let tag_y = if y1 >= LABEL_HEIGHT { y1 - LABEL_HEIGHT } else { y2 };
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(x1, tag_y).of_size(width.max(40), LABEL_HEIGHT as u32),
                color,
            );

            if let Some(font) = &self.font {
                let label = if self.show_confidence {
                    format!("{} {:.2}", det.class_name, det.confidence)
                } else {
                    det.class_name.clone()
                };
                draw_text_mut(
                    &mut canvas,
                    Rgb([255, 255, 255]),
                    x1 + 2,
                    tag_y + 1,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &label,
                );
            }
        }

        canvas
    }
}

/// Deterministic per-class color cycle.
fn class_color(class_id: usize) -> Rgb<u8> {
    const COLORS: [[u8; 3]; 6] = [
        [0, 0, 255],
        [0, 255, 0],
        [255, 0, 0],
        [0, 255, 255],
        [255, 0, 255],
        [255, 255, 0],
    ];
    Rgb(COLORS[class_id % COLORS.len()])
}
