//! Composition root: owns the screen, the mode and the backlog, and turns
//! button presses and scheduler ticks into at most one display write each.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use image::RgbaImage;
use tracing::{error, info};

use crate::backlog::ImageBacklog;
use crate::display::DisplayDriver;
use crate::events::{Button, Mode, Outcome};
use crate::mode::ModeState;
use crate::platform::power::HostPower;
use crate::processing::diagnostics::{DiagnosticsRenderer, read_tail};
use crate::processing::layout::fit_to_display;
use crate::processing::overlay::DateOverlay;
use crate::screen::ScreenLock;
use crate::supply::Photo;
use crate::tasks::refill::RefillWorker;

/// Numbered dashboard captures, one slot per configured URL.
#[derive(Debug, Clone)]
pub struct ScreenshotSet {
    directory: PathBuf,
    slots: usize,
}

impl ScreenshotSet {
    pub fn new(directory: impl Into<PathBuf>, slots: usize) -> Self {
        Self {
            directory: directory.into(),
            slots: slots.max(1),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.directory.join(format!("screenshot_{index}.png"))
    }
}

/// Where the diagnostics screen gets its text and how it draws it.
#[derive(Clone)]
pub struct DiagnosticsSource {
    pub renderer: DiagnosticsRenderer,
    pub log_file: PathBuf,
    pub max_lines: usize,
}

pub struct Components {
    pub display: Box<dyn DisplayDriver>,
    pub initial_mode: Mode,
    pub backlog: Arc<ImageBacklog>,
    pub refill: RefillWorker,
    pub screenshots: ScreenshotSet,
    pub date_overlay: Option<DateOverlay>,
    pub diagnostics: DiagnosticsSource,
    pub power: Box<dyn HostPower>,
}

pub struct DisplayOrchestrator {
    screen: ScreenLock,
    mode: ModeState,
    backlog: Arc<ImageBacklog>,
    refill: RefillWorker,
    screenshots: ScreenshotSet,
    date_overlay: Option<DateOverlay>,
    diagnostics: DiagnosticsSource,
    power: Box<dyn HostPower>,
    shutdown_pending: AtomicBool,
}

impl DisplayOrchestrator {
    pub fn new(components: Components) -> Self {
        let Components {
            display,
            initial_mode,
            backlog,
            refill,
            screenshots,
            date_overlay,
            diagnostics,
            power,
        } = components;
        Self {
            screen: ScreenLock::new(display),
            mode: ModeState::new(initial_mode),
            backlog,
            refill,
            screenshots,
            date_overlay,
            diagnostics,
            power,
            shutdown_pending: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.current()
    }

    pub fn screenshot_cursor(&self) -> Option<usize> {
        self.mode.cursor()
    }

    pub fn backlog(&self) -> &ImageBacklog {
        &self.backlog
    }

    pub fn is_busy(&self) -> bool {
        self.screen.is_busy()
    }

    /// A power-off request is waiting for the screen or has been issued.
    pub fn shutdown_pending(&self) -> bool {
        self.shutdown_pending.load(Ordering::Acquire)
    }

    /// React to one button press. Blocks for the duration of any render it
    /// starts, so call it off the async runtime.
    pub fn handle_button(&self, button: Button) -> Outcome {
        match button {
            Button::A => {
                info!("button A pressed; showing dashboard screenshots");
                if self.screen.is_busy() {
                    info!("skipping screenshot refresh because a refresh is already underway");
                    return Outcome::SkippedBusy;
                }
                self.mode.enter_screenshots();
                self.settle("screenshot", self.show_next_screenshot())
            }
            Button::B => {
                info!("button B pressed; forcing the next photo");
                if self.screen.is_busy() {
                    info!("skipping photo refresh because a refresh is already underway");
                    return Outcome::SkippedBusy;
                }
                self.mode.set(Mode::GooglePhotos);
                self.settle("photo", self.show_next_photo())
            }
            Button::C => {
                let entering = self.mode.current() != Mode::Debugging;
                self.mode.set(Mode::Debugging);
                info!(
                    "button C pressed; {}",
                    if entering {
                        "entering debugging mode"
                    } else {
                        "refreshing diagnostics"
                    }
                );
                self.settle("diagnostics", self.show_diagnostics())
            }
            Button::D => {
                info!("button D pressed; shutting down");
                self.power_off()
            }
        }
    }

    /// One scheduler tick: render whatever the current mode calls for.
    pub fn tick(&self) -> Outcome {
        let mode = self.mode.current();
        info!(%mode, "automatic refresh requested");
        match mode {
            Mode::Debugging => {
                info!("debugging mode is on; skipping refresh");
                Outcome::Idle
            }
            Mode::GooglePhotos => self.settle("photo", self.show_next_photo()),
            Mode::Screenshots => self.settle("screenshot", self.show_next_screenshot()),
        }
    }

    /// Render a single frame for `mode` without touching the current mode.
    pub fn render_once(&self, mode: Mode) -> Outcome {
        match mode {
            Mode::Screenshots => self.settle("screenshot", self.show_next_screenshot()),
            Mode::GooglePhotos => self.settle("photo", self.show_next_photo()),
            Mode::Debugging => self.settle("diagnostics", self.show_diagnostics()),
        }
    }

    fn show_next_photo(&self) -> Result<Outcome> {
        info!(size = self.backlog.len(), "image backlog size");
        let photo = self.backlog.take_one().context("no photo to show")?;
        info!(source = %photo.source.display(), "showing next photo");

        let shown = self
            .prepare_photo(&photo)
            .and_then(|frame| self.present(&frame));
        self.backlog.release(photo);
        self.refill.request();
        shown.map(|()| Outcome::Shown)
    }

    fn prepare_photo(&self, photo: &Photo) -> Result<RgbaImage> {
        let mut frame = fit_to_display(&photo.image, self.screen.resolution())?;
        if let (Some(overlay), Some(date)) = (&self.date_overlay, photo.taken_on) {
            overlay.apply(&mut frame, date);
        }
        Ok(frame)
    }

    fn show_next_screenshot(&self) -> Result<Outcome> {
        let index = self.mode.advance_cursor(self.screenshots.slots());
        let path = self.screenshots.path_for(index);
        if !path.exists() {
            error!(path = %path.display(), "screenshot not found; skipping display");
            return Ok(Outcome::ScreenshotMissing);
        }

        info!(path = %path.display(), index, "showing screenshot");
        let image = image::open(&path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgba8();
        let frame = fit_to_display(&image, self.screen.resolution())?;
        self.present(&frame)?;
        Ok(Outcome::Shown)
    }

    fn show_diagnostics(&self) -> Result<Outcome> {
        // Probe first; the write below still waits if someone slips in
        // between the probe and the acquire.
        if self.screen.is_busy() {
            info!("screen is busy; skipping diagnostics screen");
            return Ok(Outcome::SkippedBusy);
        }

        let DiagnosticsSource {
            renderer,
            log_file,
            max_lines,
        } = &self.diagnostics;
        let lines = read_tail(log_file, *max_lines)
            .with_context(|| format!("failed to read {}", log_file.display()))?;
        let header = [
            format!("Diagnostics  {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
            format!(
                "mode: {}  backlog: {}  screenshot slots: {}",
                self.mode.current(),
                self.backlog.len(),
                self.screenshots.slots()
            ),
        ];
        let frame = renderer.render(&header, &lines, self.screen.resolution());
        self.present(&frame)?;
        Ok(Outcome::Shown)
    }

    fn power_off(&self) -> Outcome {
        if self.shutdown_pending.swap(true, Ordering::AcqRel) {
            info!("power-off already pending; ignoring");
            return Outcome::Idle;
        }

        info!("waiting for the screen to finish before powering off");
        let _screen = self.screen.acquire();
        match self.power.power_off() {
            Ok(()) => {
                info!("shutting down");
                Outcome::PoweredOff
            }
            Err(err) => {
                error!("failed to shut down: {err}");
                self.shutdown_pending.store(false, Ordering::Release);
                Outcome::PowerOffFailed
            }
        }
    }

    // The screen is held only for the write itself; the guard is dropped on
    // return whether or not it succeeded.
    fn present(&self, frame: &RgbaImage) -> Result<()> {
        let mut guard = self.screen.acquire();
        guard.present(frame)?;
        info!("done writing image");
        Ok(())
    }

    fn settle(&self, pipeline: &'static str, result: Result<Outcome>) -> Outcome {
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(pipeline, "{err:#}");
                Outcome::Failed
            }
        }
    }
}
