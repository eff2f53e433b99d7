use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::display::Border;
use crate::events::Mode;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// How often the scheduler renders the next frame.
    #[serde(with = "humantime_serde")]
    pub refresh_period: Duration,
    /// Mode active right after startup.
    pub initial_mode: Mode,
    pub display: DisplayConfig,
    pub screenshots: ScreenshotConfig,
    pub photos: PhotoConfig,
    pub date_overlay: DateOverlayConfig,
    pub buttons: ButtonConfig,
    pub diagnostics: DiagnosticsConfig,
    /// TTF/OTF font for the date overlay and diagnostics screen. A system
    /// sans-serif face is used when unset.
    pub font_path: Option<PathBuf>,
    /// Shell command that shuts the host down.
    pub power_off_command: String,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.refresh_period.is_zero(),
            "refresh-period must be greater than zero"
        );
        self.display.validate()?;
        self.screenshots.validate()?;
        self.photos.validate()?;
        self.date_overlay.validate()?;
        self.buttons.validate()?;
        self.diagnostics.validate()?;
        ensure!(
            !self.power_off_command.trim().is_empty(),
            "power-off-command must not be blank"
        );
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            refresh_period: Duration::from_secs(15 * 60),
            initial_mode: Mode::default(),
            display: DisplayConfig::default(),
            screenshots: ScreenshotConfig::default(),
            photos: PhotoConfig::default(),
            date_overlay: DateOverlayConfig::default(),
            buttons: ButtonConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            font_path: None,
            power_off_command: "systemctl poweroff".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", rename_all = "kebab-case")]
pub enum DisplayConfig {
    /// Linux fbdev panel such as `/dev/fb0`.
    #[serde(rename_all = "kebab-case")]
    Framebuffer {
        #[serde(default = "DisplayConfig::default_device")]
        device: PathBuf,
        #[serde(default)]
        border: Border,
    },
    /// Writes each frame to a PNG file instead of a panel.
    #[serde(rename_all = "kebab-case")]
    PngFile {
        path: PathBuf,
        width: u32,
        height: u32,
        #[serde(default)]
        border: Border,
    },
}

impl DisplayConfig {
    fn default_device() -> PathBuf {
        PathBuf::from("/dev/fb0")
    }

    pub fn border(&self) -> Border {
        match self {
            Self::Framebuffer { border, .. } | Self::PngFile { border, .. } => *border,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Self::PngFile { width, height, .. } = self {
            ensure!(
                *width > 0 && *height > 0,
                "display width and height must be greater than zero"
            );
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::Framebuffer {
            device: Self::default_device(),
            border: Border::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScreenshotConfig {
    /// Where the capture job drops `screenshot_<index>.png`.
    pub directory: PathBuf,
    /// Dashboard pages being captured; one screenshot slot per URL.
    pub urls: Vec<String>,
}

impl ScreenshotConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.urls.is_empty(),
            "screenshots.urls must list at least one dashboard"
        );
        Ok(())
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/var/lib/eink-frame/screenshots"),
            urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PhotoConfig {
    pub library_path: PathBuf,
    /// Number of decoded photos kept ready.
    pub backlog_size: usize,
    /// Pause between attempts to fill the backlog at startup.
    #[serde(with = "humantime_serde")]
    pub startup_retry_delay: Duration,
    /// Pending refill requests beyond which new ones are dropped.
    pub refill_queue: usize,
    /// Remove a photo from the library once it has been shown.
    pub delete_after_display: bool,
}

impl PhotoConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.backlog_size > 0,
            "photos.backlog-size must be greater than zero"
        );
        ensure!(
            self.refill_queue > 0,
            "photos.refill-queue must be greater than zero"
        );
        Ok(())
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from("/var/lib/eink-frame/photos"),
            backlog_size: 10,
            startup_retry_delay: Duration::from_secs(300),
            refill_queue: 8,
            delete_after_display: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DateOverlayConfig {
    pub enabled: bool,
    /// `chrono` strftime pattern.
    pub format: String,
    pub font_size: f32,
}

impl DateOverlayConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.format.trim().is_empty(),
            "date-overlay.format must not be blank"
        );
        ensure!(
            self.font_size.is_finite() && self.font_size > 0.0,
            "date-overlay.font-size must be positive"
        );
        Ok(())
    }
}

impl Default for DateOverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: "%d.%m.%Y".into(),
            font_size: 28.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ButtonConfig {
    pub enabled: bool,
    /// GPIO character device the buttons are wired to.
    pub chip: PathBuf,
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
    pub pins: ButtonPins,
}

impl ButtonConfig {
    fn validate(&self) -> Result<()> {
        let pins = [self.pins.a, self.pins.b, self.pins.c, self.pins.d];
        let distinct: HashSet<u32> = pins.iter().copied().collect();
        ensure!(
            distinct.len() == pins.len(),
            "buttons.pins must assign a different pin to every button"
        );
        if self.debounce < Duration::from_millis(200) {
            tracing::warn!(
                debounce = %humantime::format_duration(self.debounce),
                "short debounce window; a single press may fire twice"
            );
        }
        Ok(())
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chip: PathBuf::from("/dev/gpiochip0"),
            debounce: Duration::from_millis(250),
            pins: ButtonPins::default(),
        }
    }
}

/// BCM line offsets of the four buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ButtonPins {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl Default for ButtonPins {
    fn default() -> Self {
        Self {
            a: 5,
            b: 6,
            c: 16,
            d: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Append-only log file; its tail is what the diagnostics screen shows.
    pub log_file: PathBuf,
    pub max_lines: usize,
    pub font_size: f32,
}

impl DiagnosticsConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_lines > 0,
            "diagnostics.max-lines must be greater than zero"
        );
        ensure!(
            self.font_size.is_finite() && self.font_size > 0.0,
            "diagnostics.font-size must be positive"
        );
        Ok(())
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/var/log/eink-frame.log"),
            max_lines: 40,
            font_size: 14.0,
        }
    }
}
