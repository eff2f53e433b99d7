//! Software text rendering onto RGBA frames.

use std::fs;
use std::path::Path;

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use fontdb::{Database, Family, Query};
use image::{Rgba, RgbaImage};

/// Load the configured font file, or else a system face: monospace first
/// since most of what gets drawn is log output.
pub fn load_font(path: Option<&Path>) -> Result<FontArc> {
    if let Some(path) = path {
        let data =
            fs::read(path).with_context(|| format!("failed to read font at {}", path.display()))?;
        return FontArc::try_from_vec(data)
            .with_context(|| format!("failed to decode font at {}", path.display()));
    }

    let mut db = Database::new();
    db.load_system_fonts();
    let queried = [Family::Monospace, Family::SansSerif]
        .into_iter()
        .filter_map(|family| {
            db.query(&Query {
                families: &[family],
                ..Default::default()
            })
        });
    queried
        .chain(db.faces().map(|face| face.id))
        .find_map(|id| decode_face(&db, id))
        .ok_or_else(|| anyhow!("no usable system font found"))
}

// Faces inside collections are picked by index; undecodable ones are skipped.
fn decode_face(db: &Database, id: fontdb::ID) -> Option<FontArc> {
    db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
    })
    .flatten()
    .map(FontArc::new)
}

/// Vertical metrics for one line of text at a given scale.
#[derive(Debug, Clone, Copy)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent + self.line_gap
    }
}

pub fn line_metrics(font: &FontArc, scale: PxScale) -> LineMetrics {
    let scaled = font.as_scaled(scale);
    LineMetrics {
        ascent: scaled.ascent(),
        descent: scaled.descent().abs(),
        line_gap: scaled.line_gap(),
    }
}

pub fn measure_text(text: &str, font: &FontArc, scale: PxScale) -> f32 {
    let scaled_font = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut previous = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph_id = scaled_font.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    width.max(0.0)
}

/// Greedy word wrap. Words wider than `max_width` (long paths in log lines)
/// are broken between characters first.
pub fn wrap_text(text: &str, font: &FontArc, scale: PxScale, max_width: f32) -> Vec<String> {
    let fits = |s: &str| measure_text(s, font, scale) <= max_width;
    let mut lines = Vec::new();
    let mut line = String::new();
    for piece in text.split_whitespace().flat_map(|word| split_word(word, &fits)) {
        if line.is_empty() {
            line = piece;
            continue;
        }
        let joined = format!("{line} {piece}");
        if fits(&joined) {
            line = joined;
        } else {
            lines.push(std::mem::replace(&mut line, piece));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn split_word<F: Fn(&str) -> bool>(word: &str, fits: &F) -> Vec<String> {
    if fits(word) {
        return vec![word.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if !fits(&current) && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::replace(&mut current, ch.to_string()));
        }
    }
    pieces.push(current);
    pieces
}

/// Draw `text` with its baseline at `baseline`, clipped to the image.
pub fn draw_text(
    img: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    color: Rgba<u8>,
    left: f32,
    baseline: f32,
    scale: PxScale,
) {
    let scaled = font.as_scaled(scale);
    let mut cursor_x = left;
    let mut previous = None;
    for ch in text.chars() {
        if ch.is_control() {
            continue;
        }
        let glyph = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            cursor_x += scaled.kern(prev, glyph);
        }
        let advance = scaled.h_advance(glyph);
        let mut positioned = scaled.scaled_glyph(ch);
        positioned.position = point(cursor_x, baseline);
        if let Some(outline) = font.outline_glyph(positioned) {
            let bounds = outline.px_bounds();
            outline.draw(|x, y, coverage| {
                let px = bounds.min.x as i32 + x as i32;
                let py = bounds.min.y as i32 + y as i32;
                blend_pixel(img, px, py, color, coverage);
            });
        }
        cursor_x += advance;
        previous = Some(glyph);
    }
}

pub fn fill_rect(img: &mut RgbaImage, left: u32, top: u32, width: u32, height: u32, color: Rgba<u8>) {
    let right = left.saturating_add(width).min(img.width());
    let bottom = top.saturating_add(height).min(img.height());
    for y in top..bottom {
        for x in left..right {
            img.put_pixel(x, y, color);
        }
    }
}

fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * f32::from(color[3]) / 255.0).clamp(0.0, 1.0);
    let dst = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let src = f32::from(color[c]);
        let base = f32::from(dst[c]);
        dst[c] = (src * alpha + base * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = 255;
}
