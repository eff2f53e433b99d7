use ab_glyph::{FontArc, PxScale};
use chrono::NaiveDate;
use image::{Rgba, RgbaImage};

use super::text::{draw_text, fill_rect, line_metrics, measure_text};

const MARGIN: f32 = 12.0;
const PADDING: f32 = 6.0;

/// Burns the capture date into the bottom-right corner of a frame.
#[derive(Clone)]
pub struct DateOverlay {
    font: FontArc,
    format: String,
    scale: PxScale,
}

impl DateOverlay {
    pub fn new(font: FontArc, format: impl Into<String>, font_size: f32) -> Self {
        Self {
            font,
            format: format.into(),
            scale: PxScale::from(font_size),
        }
    }

    pub fn label(&self, date: NaiveDate) -> String {
        date.format(&self.format).to_string()
    }

    pub fn apply(&self, frame: &mut RgbaImage, date: NaiveDate) {
        let label = self.label(date);
        let metrics = line_metrics(&self.font, self.scale);
        let text_w = measure_text(&label, &self.font, self.scale);
        let box_w = text_w + 2.0 * PADDING;
        let box_h = metrics.ascent + metrics.descent + 2.0 * PADDING;

        let left = (frame.width() as f32 - box_w - MARGIN).max(0.0);
        let top = (frame.height() as f32 - box_h - MARGIN).max(0.0);
        fill_rect(
            frame,
            left as u32,
            top as u32,
            box_w.ceil() as u32,
            box_h.ceil() as u32,
            Rgba([255, 255, 255, 255]),
        );
        draw_text(
            frame,
            &self.font,
            &label,
            Rgba([0, 0, 0, 255]),
            left + PADDING,
            top + PADDING + metrics.ascent,
            self.scale,
        );
    }
}

impl std::fmt::Debug for DateOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateOverlay")
            .field("format", &self.format)
            .field("scale", &self.scale.y)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::text::load_font;

    #[test]
    fn formats_with_the_configured_pattern() {
        let Ok(font) = load_font(None) else {
            return;
        };
        let overlay = DateOverlay::new(font, "%d.%m.%Y", 20.0);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(overlay.label(date), "09.03.2024");
    }

    #[test]
    fn draws_inside_the_bottom_right_corner() {
        let Ok(font) = load_font(None) else {
            return;
        };
        let overlay = DateOverlay::new(font, "%Y-%m-%d", 20.0);
        let mut frame = RgbaImage::from_pixel(320, 200, Rgba([40, 40, 40, 255]));
        overlay.apply(&mut frame, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        assert_eq!(frame.get_pixel(0, 0), &Rgba([40, 40, 40, 255]));
        let touched = frame
            .enumerate_pixels()
            .filter(|(x, y, p)| *x > 160 && *y > 100 && p[0] != 40)
            .count();
        assert!(touched > 0);
    }
}
