//! Button input over the Linux GPIO character device.
//!
//! Pull-ups are expected to come from the device tree
//! (`gpio=5,6,16,24=ip,pu` on a Raspberry Pi); the lines are only read here.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use gpio_cdev::{Chip, EventRequestFlags, LineRequestFlags};
use tracing::{info, warn};

use crate::button::{Debouncer, InputCapability, PressCallback};

const CONSUMER: &str = "eink-frame";

pub struct GpioInput {
    chip: Chip,
}

impl GpioInput {
    pub fn open(chip: &Path) -> Result<Self> {
        let chip = Chip::new(chip)
            .with_context(|| format!("failed to open GPIO chip {}", chip.display()))?;
        info!(chip = %chip.path().display(), lines = chip.num_lines(), "opened GPIO chip");
        Ok(Self { chip })
    }
}

impl InputCapability for GpioInput {
    fn register(&mut self, pin: u32, debounce: Duration, on_press: PressCallback) -> Result<()> {
        let line = self
            .chip
            .get_line(pin)
            .with_context(|| format!("failed to get GPIO line {pin}"))?;
        let events = line
            .events(
                LineRequestFlags::INPUT,
                EventRequestFlags::FALLING_EDGE,
                CONSUMER,
            )
            .with_context(|| format!("failed to request edge events on line {pin}"))?;

        thread::Builder::new()
            .name(format!("gpio-{pin}"))
            .spawn(move || {
                let mut debouncer = Debouncer::new(debounce);
                for event in events {
                    match event {
                        Ok(_) => {
                            if debouncer.accept(Instant::now()) {
                                on_press();
                            }
                        }
                        Err(err) => {
                            warn!(pin, "stopped watching GPIO line: {err}");
                            break;
                        }
                    }
                }
            })
            .with_context(|| format!("failed to spawn watcher for line {pin}"))?;
        Ok(())
    }
}
