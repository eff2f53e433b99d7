//! The troubleshooting screen: a few status lines followed by the tail of
//! the log file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};

use super::text::{draw_text, fill_rect, line_metrics, wrap_text};

const MARGIN: f32 = 10.0;
const TAIL_CHUNK: u64 = 8 * 1024;
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Last `max_lines` lines of `path`. A missing file yields an empty tail.
///
/// The log is append-only and never rotated, so it is read backwards from
/// the end in fixed-size chunks until enough line breaks have been seen.
pub fn read_tail(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    if max_lines == 0 {
        return Ok(Vec::new());
    }

    let mut pos = file.seek(SeekFrom::End(0))?;
    let mut buf = Vec::new();
    let mut newlines = 0;
    // One break more than `max_lines` guarantees a complete oldest line,
    // even when the file ends with a trailing newline.
    while pos > 0 && newlines <= max_lines {
        let step = pos.min(TAIL_CHUNK);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut chunk = vec![0; step as usize];
        file.read_exact(&mut chunk)?;
        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    // A chunk boundary may split a multi-byte sequence; lossy decoding keeps
    // the damage inside the partial line that is dropped below.
    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..].iter().map(|line| line.to_string()).collect())
}

#[derive(Clone)]
pub struct DiagnosticsRenderer {
    font: Option<FontArc>,
    scale: PxScale,
}

impl DiagnosticsRenderer {
    pub fn new(font: Option<FontArc>, font_size: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(font_size),
        }
    }

    /// Render `header` above a rule and `lines` below it, black on white, at
    /// exactly `resolution`. Lines that do not fit are dropped from the top
    /// so the newest entries stay visible.
    pub fn render(&self, header: &[String], lines: &[String], resolution: (u32, u32)) -> RgbaImage {
        let (width, height) = resolution;
        let mut img = RgbaImage::from_pixel(width, height, WHITE);
        let Some(font) = &self.font else {
            tracing::warn!("no font available; diagnostics screen carries no text");
            fill_rect(&mut img, 0, 0, width, (height / 10).max(1), BLACK);
            return img;
        };

        let metrics = line_metrics(font, self.scale);
        let line_h = metrics.height().max(1.0);
        let max_w = (width as f32 - 2.0 * MARGIN).max(1.0);

        let mut baseline = MARGIN + metrics.ascent;
        for text in header {
            for row in wrap_text(text, font, self.scale, max_w) {
                draw_text(&mut img, font, &row, BLACK, MARGIN, baseline, self.scale);
                baseline += line_h;
            }
        }

        let rule_y = (baseline - metrics.ascent + line_h * 0.25).max(0.0) as u32;
        fill_rect(&mut img, MARGIN as u32, rule_y, max_w as u32, 2, BLACK);
        let body_top = rule_y as f32 + 2.0 + line_h * 0.5;

        let rows: Vec<String> = lines
            .iter()
            .flat_map(|line| {
                let wrapped = wrap_text(line, font, self.scale, max_w);
                if wrapped.is_empty() {
                    vec![String::new()]
                } else {
                    wrapped
                }
            })
            .collect();
        let capacity = ((height as f32 - body_top - MARGIN) / line_h).floor().max(0.0) as usize;
        let skip = rows.len().saturating_sub(capacity);

        let mut baseline = body_top + metrics.ascent;
        for row in rows.iter().skip(skip) {
            draw_text(&mut img, font, row, BLACK, MARGIN, baseline, self.scale);
            baseline += line_h;
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::text::load_font;
    use std::io::Write;

    #[test]
    fn tail_keeps_the_newest_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.log");
        let mut file = File::create(&path).unwrap();
        for i in 0..10 {
            writeln!(file, "line {i}").unwrap();
        }
        let tail = read_tail(&path, 3).unwrap();
        assert_eq!(tail, vec!["line 7", "line 8", "line 9"]);
    }

    #[test]
    fn tail_of_a_log_spanning_many_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.log");
        let mut file = File::create(&path).unwrap();
        for i in 0..20_000 {
            writeln!(file, "2024-03-09T10:00:00Z  INFO eink_frame: entry {i}").unwrap();
        }
        write!(file, "unterminated").unwrap();
        drop(file);

        let tail = read_tail(&path, 3).unwrap();
        assert_eq!(tail.len(), 3);
        assert!(tail[0].ends_with("entry 19998"));
        assert!(tail[1].ends_with("entry 19999"));
        assert_eq!(tail[2], "unterminated");
    }

    #[test]
    fn short_log_is_returned_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.log");
        std::fs::write(&path, "only\r\ntwo\n").unwrap();
        assert_eq!(read_tail(&path, 10).unwrap(), vec!["only", "two"]);
        assert!(read_tail(&path, 0).unwrap().is_empty());
    }

    #[test]
    fn missing_log_is_an_empty_tail() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_tail(&dir.path().join("absent.log"), 5).unwrap().is_empty());
    }

    #[test]
    fn renders_at_the_requested_resolution() {
        let renderer = DiagnosticsRenderer::new(load_font(None).ok(), 12.0);
        let lines: Vec<String> = (0..200).map(|i| format!("entry {i}")).collect();
        let img = renderer.render(&["diagnostics".to_string()], &lines, (200, 120));
        assert_eq!(img.dimensions(), (200, 120));
        assert!(img.pixels().any(|p| p[0] < 128));
    }
}
