use anyhow::{Context, Result};
use image::RgbaImage;
use serde::Deserialize;

use crate::config::DisplayConfig;
use crate::platform::framebuffer::FramebufferDisplay;
use crate::platform::png_file::PngFileDisplay;

/// Colour of the panel area outside the active image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Border {
    #[default]
    White,
    Black,
}

impl Border {
    pub fn rgba(self) -> image::Rgba<u8> {
        match self {
            Self::White => image::Rgba([255, 255, 255, 255]),
            Self::Black => image::Rgba([0, 0, 0, 255]),
        }
    }
}

/// A physical panel. `show` is the slow, exclusive refresh; callers reach it
/// only through [`crate::screen::ScreenGuard`].
pub trait DisplayDriver: Send {
    fn resolution(&self) -> (u32, u32);
    fn set_image(&mut self, image: &RgbaImage) -> Result<()>;
    fn show(&mut self) -> Result<()>;
    fn set_border(&mut self, border: Border) -> Result<()>;
}

/// Open the configured driver. Any failure here is a fatal startup error.
pub fn open_display(cfg: &DisplayConfig) -> Result<Box<dyn DisplayDriver>> {
    let mut display: Box<dyn DisplayDriver> = match cfg {
        DisplayConfig::Framebuffer { device, .. } => Box::new(
            FramebufferDisplay::open(device)
                .with_context(|| format!("failed to open framebuffer {}", device.display()))?,
        ),
        DisplayConfig::PngFile {
            path,
            width,
            height,
            ..
        } => Box::new(PngFileDisplay::new(path.clone(), *width, *height)),
    };
    display
        .set_border(cfg.border())
        .context("failed to set display border")?;
    let (width, height) = display.resolution();
    tracing::info!(width, height, border = ?cfg.border(), "initialised display");
    Ok(display)
}
