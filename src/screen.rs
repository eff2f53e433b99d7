//! Exclusive access to the physical display.
//!
//! The driver lives inside the lock, so the only way to write a frame is
//! through a [`ScreenGuard`]. Dropping the guard releases the screen no matter
//! how the write ended.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use image::RgbaImage;
use tracing::{debug, warn};

use crate::display::DisplayDriver;
use crate::error::ScreenError;

pub struct ScreenLock {
    display: Mutex<Box<dyn DisplayDriver>>,
    busy: AtomicBool,
    resolution: (u32, u32),
}

impl ScreenLock {
    pub fn new(display: Box<dyn DisplayDriver>) -> Self {
        let resolution = display.resolution();
        Self {
            display: Mutex::new(display),
            busy: AtomicBool::new(false),
            resolution,
        }
    }

    /// Native panel resolution, queried once at construction.
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// Non-blocking probe. The answer may be stale by the time it is used.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Block until the screen is free.
    pub fn acquire(&self) -> ScreenGuard<'_> {
        let display = self.display.lock().unwrap_or_else(|poisoned| {
            warn!("display lock poisoned by a panicked render; recovering");
            PoisonError::into_inner(poisoned)
        });
        self.guard(display)
    }

    fn guard<'a>(&'a self, display: MutexGuard<'a, Box<dyn DisplayDriver>>) -> ScreenGuard<'a> {
        self.busy.store(true, Ordering::Release);
        ScreenGuard {
            display,
            busy: &self.busy,
            resolution: self.resolution,
        }
    }
}

pub struct ScreenGuard<'a> {
    display: MutexGuard<'a, Box<dyn DisplayDriver>>,
    busy: &'a AtomicBool,
    resolution: (u32, u32),
}

impl ScreenGuard<'_> {
    /// Write one frame: hand it to the driver, then run the slow refresh.
    pub fn present(&mut self, frame: &RgbaImage) -> Result<(), ScreenError> {
        let actual = frame.dimensions();
        if actual != self.resolution {
            return Err(ScreenError::ResolutionMismatch {
                expected: self.resolution,
                actual,
            });
        }
        self.display.set_image(frame).map_err(ScreenError::Driver)?;
        self.display.show().map_err(ScreenError::Driver)?;
        debug!("done writing frame");
        Ok(())
    }
}

impl Drop for ScreenGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
