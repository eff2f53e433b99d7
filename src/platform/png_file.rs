//! Headless display that writes every shown frame to a PNG file.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::display::{Border, DisplayDriver};

pub struct PngFileDisplay {
    path: PathBuf,
    width: u32,
    height: u32,
    border: Border,
    pending: Option<RgbaImage>,
}

impl PngFileDisplay {
    pub fn new(path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
            border: Border::default(),
            pending: None,
        }
    }
}

impl DisplayDriver for PngFileDisplay {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_image(&mut self, image: &RgbaImage) -> Result<()> {
        // The panel is opaque; flatten any alpha onto the border colour.
        let background = self.border.rgba();
        let mut frame = image.clone();
        for px in frame.pixels_mut() {
            let alpha = u16::from(px[3]);
            for c in 0..3 {
                let fg = u16::from(px[c]) * alpha;
                let bg = u16::from(background[c]) * (255 - alpha);
                px[c] = ((fg + bg + 127) / 255) as u8;
            }
            px[3] = 255;
        }
        self.pending = Some(frame);
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let frame = self
            .pending
            .as_ref()
            .ok_or_else(|| anyhow!("show called before an image was set"))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("png.tmp");
        frame
            .save_with_format(&tmp, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move frame into {}", self.path.display()))?;
        debug!(path = %self.path.display(), "frame written");
        Ok(())
    }

    fn set_border(&mut self, border: Border) -> Result<()> {
        self.border = border;
        Ok(())
    }
}
