#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use eink_frame::backlog::ImageBacklog;
use eink_frame::display::{Border, DisplayDriver};
use eink_frame::error::{PowerError, SupplyError};
use eink_frame::events::Mode;
use eink_frame::orchestrator::{Components, DiagnosticsSource, DisplayOrchestrator, ScreenshotSet};
use eink_frame::platform::power::HostPower;
use eink_frame::processing::diagnostics::DiagnosticsRenderer;
use eink_frame::retry::RetryPolicy;
use eink_frame::supply::{ImageSupply, Photo};
use eink_frame::tasks::refill::RefillWorker;
use image::{Rgba, RgbaImage};

pub const RESOLUTION: (u32, u32) = (8, 4);
pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Lets a test hold a display write or a supply fetch open.
#[derive(Clone, Default)]
pub struct Gate {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn close(&self) {
        *self.state.0.lock().unwrap() = true;
    }

    pub fn open(&self) {
        *self.state.0.lock().unwrap() = false;
        self.state.1.notify_all();
    }

    fn wait(&self) {
        let (lock, cvar) = &*self.state;
        let mut closed = lock.lock().unwrap();
        while *closed {
            closed = cvar.wait(closed).unwrap();
        }
    }
}

#[derive(Clone, Default)]
pub struct DisplayProbe {
    pub shown: Arc<Mutex<Vec<Rgba<u8>>>>,
    pub entered: Arc<AtomicUsize>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    pub gate: Gate,
    /// Makes the next `show` panic mid-write.
    pub panic_next: Arc<AtomicBool>,
}

impl DisplayProbe {
    pub fn shown(&self) -> Vec<Rgba<u8>> {
        self.shown.lock().unwrap().clone()
    }

    pub fn wait_until_entered(&self, count: usize) {
        wait_for(|| self.entered.load(Ordering::SeqCst) >= count);
    }
}

/// Records the top-left pixel of every frame it shows.
pub struct FakeDisplay {
    probe: DisplayProbe,
    pending: Option<Rgba<u8>>,
    write_time: Duration,
}

impl DisplayDriver for FakeDisplay {
    fn resolution(&self) -> (u32, u32) {
        RESOLUTION
    }

    fn set_image(&mut self, image: &RgbaImage) -> anyhow::Result<()> {
        self.pending = Some(*image.get_pixel(0, 0));
        Ok(())
    }

    fn show(&mut self) -> anyhow::Result<()> {
        let probe = &self.probe;
        let now = probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        probe.entered.fetch_add(1, Ordering::SeqCst);
        probe.gate.wait();
        if probe.panic_next.swap(false, Ordering::SeqCst) {
            probe.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("panel controller crashed");
        }
        thread::sleep(self.write_time);
        if let Some(px) = self.pending.take() {
            probe.shown.lock().unwrap().push(px);
        }
        probe.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_border(&mut self, _border: Border) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hands out solid blue photos at the panel resolution.
#[derive(Default)]
pub struct FakeSupply {
    /// Fetches started, including ones that failed or are held at the gate.
    pub attempts: AtomicUsize,
    pub served: AtomicUsize,
    pub released: AtomicUsize,
    pub failing: AtomicBool,
    pub gate: Gate,
}

impl FakeSupply {
    fn next_photo(&self) -> Photo {
        let id = self.served.fetch_add(1, Ordering::SeqCst);
        Photo {
            image: RgbaImage::from_pixel(RESOLUTION.0, RESOLUTION.1, BLUE),
            source: PathBuf::from(format!("/photos/{id}.jpg")),
            taken_on: None,
        }
    }
}

impl ImageSupply for FakeSupply {
    fn random_image(&self) -> Result<Photo, SupplyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.gate.wait();
        if self.failing.load(Ordering::SeqCst) {
            return Err(SupplyError::Unavailable("album offline".into()));
        }
        Ok(self.next_photo())
    }

    fn release(&self, _photo: Photo) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakePower {
    pub calls: Arc<AtomicUsize>,
    pub refuse: Arc<AtomicBool>,
}

impl HostPower for FakePower {
    fn power_off(&self) -> Result<(), PowerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            Err(PowerError::NotPrivileged)
        } else {
            Ok(())
        }
    }
}

pub struct Harness {
    pub orchestrator: Arc<DisplayOrchestrator>,
    pub display: DisplayProbe,
    pub supply: Arc<FakeSupply>,
    pub power: FakePower,
    pub dir: tempfile::TempDir,
}

pub struct HarnessBuilder {
    pub initial_mode: Mode,
    /// Colours of the screenshot files written to disk, by slot.
    pub screenshots: Vec<Rgba<u8>>,
    /// Configured slot count; defaults to the number of files.
    pub slots: Option<usize>,
    pub backlog_size: usize,
    pub prefill: bool,
    pub write_time: Duration,
    pub refill_queue: usize,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Screenshots,
            screenshots: vec![RED, GREEN],
            slots: None,
            backlog_size: 3,
            prefill: true,
            write_time: Duration::ZERO,
            refill_queue: 8,
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        for (idx, colour) in self.screenshots.iter().enumerate() {
            write_screenshot(dir.path(), idx, *colour);
        }
        let log_file = dir.path().join("frame.log");
        std::fs::write(&log_file, "first entry\nsecond entry\n").unwrap();

        let display = DisplayProbe::default();
        let supply = Arc::new(FakeSupply::default());
        let power = FakePower::default();

        let backlog = Arc::new(ImageBacklog::new(
            Arc::clone(&supply) as Arc<dyn ImageSupply>,
            self.backlog_size,
        ));
        if self.prefill {
            backlog
                .initialize(&RetryPolicy::bounded(1, Duration::ZERO))
                .unwrap();
        }
        let refill = RefillWorker::spawn(Arc::clone(&backlog), self.refill_queue).unwrap();

        let orchestrator = DisplayOrchestrator::new(Components {
            display: Box::new(FakeDisplay {
                probe: display.clone(),
                pending: None,
                write_time: self.write_time,
            }),
            initial_mode: self.initial_mode,
            backlog,
            refill,
            screenshots: ScreenshotSet::new(
                dir.path(),
                self.slots.unwrap_or(self.screenshots.len()),
            ),
            date_overlay: None,
            diagnostics: DiagnosticsSource {
                renderer: DiagnosticsRenderer::new(None, 12.0),
                log_file,
                max_lines: 10,
            },
            power: Box::new(power.clone()),
        });

        Harness {
            orchestrator: Arc::new(orchestrator),
            display,
            supply,
            power,
            dir,
        }
    }
}

pub fn write_screenshot(dir: &Path, index: usize, colour: Rgba<u8>) {
    RgbaImage::from_pixel(RESOLUTION.0, RESOLUTION.1, colour)
        .save(dir.join(format!("screenshot_{index}.png")))
        .unwrap();
}

pub fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        thread::sleep(Duration::from_millis(2));
    }
}
