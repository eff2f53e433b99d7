//! Linux fbdev display driver.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use image::RgbaImage;
use tracing::{debug, info};

use crate::display::{Border, DisplayDriver};

pub struct FramebufferDisplay {
    device: File,
    path: PathBuf,
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    stride: usize,
    border: Border,
    pending: Option<Vec<u8>>,
}

impl FramebufferDisplay {
    /// Open `/dev/fbN`, reading its geometry from `/sys/class/graphics/fbN`.
    pub fn open(device: &Path) -> Result<Self> {
        let name = device
            .file_name()
            .ok_or_else(|| anyhow!("framebuffer path {} has no device name", device.display()))?;
        let sysfs = Path::new("/sys/class/graphics").join(name);
        Self::open_with_sysfs(device, &sysfs)
    }

    pub fn open_with_sysfs(device: &Path, sysfs: &Path) -> Result<Self> {
        let virtual_size = read_attr(sysfs, "virtual_size")?;
        let (width, height) = parse_fb_virtual_size(&virtual_size).ok_or_else(|| {
            anyhow!("unparseable virtual_size '{}' for {}", virtual_size.trim(), device.display())
        })?;
        let bits_per_pixel: u32 = read_attr(sysfs, "bits_per_pixel")?
            .trim()
            .parse()
            .context("unparseable bits_per_pixel")?;
        if !matches!(bits_per_pixel, 16 | 32) {
            bail!(
                "incompatible display: {} uses {bits_per_pixel} bits per pixel (need 16 or 32)",
                device.display()
            );
        }
        let packed = width as usize * (bits_per_pixel as usize / 8);
        let stride = match read_attr(sysfs, "stride") {
            Ok(raw) => raw.trim().parse().context("unparseable stride")?,
            Err(_) => packed,
        };
        if stride < packed {
            bail!("framebuffer stride {stride} is shorter than a row of {packed} bytes");
        }

        let file = OpenOptions::new()
            .write(true)
            .open(device)
            .with_context(|| format!("failed to open {}", device.display()))?;
        info!(
            device = %device.display(),
            width,
            height,
            bits_per_pixel,
            stride,
            "opened framebuffer"
        );
        Ok(Self {
            device: file,
            path: device.to_path_buf(),
            width,
            height,
            bits_per_pixel,
            stride,
            border: Border::default(),
            pending: None,
        })
    }
}

impl DisplayDriver for FramebufferDisplay {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_image(&mut self, image: &RgbaImage) -> Result<()> {
        if image.dimensions() != (self.width, self.height) {
            bail!(
                "image is {:?} but {} is {}x{}",
                image.dimensions(),
                self.path.display(),
                self.width,
                self.height
            );
        }
        let encoded = match self.bits_per_pixel {
            16 => encode_rgb565(image, self.stride, self.border),
            _ => encode_xrgb8888(image, self.stride, self.border),
        };
        self.pending = Some(encoded);
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        let frame = self
            .pending
            .as_deref()
            .ok_or_else(|| anyhow!("show called before an image was set"))?;
        self.device
            .seek(SeekFrom::Start(0))
            .with_context(|| format!("failed to seek {}", self.path.display()))?;
        self.device
            .write_all(frame)
            .with_context(|| format!("failed to write frame to {}", self.path.display()))?;
        self.device.flush()?;
        debug!(bytes = frame.len(), "framebuffer updated");
        Ok(())
    }

    fn set_border(&mut self, border: Border) -> Result<()> {
        self.border = border;
        Ok(())
    }
}

fn read_attr(sysfs: &Path, name: &str) -> Result<String> {
    let path = sysfs.join(name);
    fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
}

fn parse_fb_virtual_size(input: &str) -> Option<(u32, u32)> {
    let mut parts = input.trim().split(',');
    let w = parts.next()?.trim().parse::<u32>().ok()?;
    let h = parts.next()?.trim().parse::<u32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

// Row padding past the visible width carries the border colour.
fn encode_xrgb8888(image: &RgbaImage, stride: usize, border: Border) -> Vec<u8> {
    let [br, bg, bb, _] = border.rgba().0;
    let mut out = Vec::with_capacity(stride * image.height() as usize);
    for row in image.rows() {
        let start = out.len();
        for px in row {
            let [r, g, b, _] = px.0;
            out.extend_from_slice(&[b, g, r, 0xFF]);
        }
        while out.len() - start < stride {
            out.extend_from_slice(&[bb, bg, br, 0xFF]);
        }
        out.truncate(start + stride);
    }
    out
}

fn encode_rgb565(image: &RgbaImage, stride: usize, border: Border) -> Vec<u8> {
    let pack = |r: u8, g: u8, b: u8| -> [u8; 2] {
        let value = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
        value.to_le_bytes()
    };
    let [br, bg, bb, _] = border.rgba().0;
    let mut out = Vec::with_capacity(stride * image.height() as usize);
    for row in image.rows() {
        let start = out.len();
        for px in row {
            let [r, g, b, _] = px.0;
            out.extend_from_slice(&pack(r, g, b));
        }
        while out.len() - start < stride {
            out.extend_from_slice(&pack(br, bg, bb));
        }
        out.truncate(start + stride);
    }
    out
}
