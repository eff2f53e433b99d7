//! Physical buttons: pin mapping, debouncing and dispatch onto the blocking
//! pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ButtonPins;
use crate::events::{Button, Outcome};
use crate::orchestrator::DisplayOrchestrator;

/// Invoked once per accepted press, on the input's own thread.
pub type PressCallback = Box<dyn Fn() + Send + Sync>;

/// Something that can watch input lines and report presses.
pub trait InputCapability {
    /// Watch `pin` for falling edges and call `on_press` for every press that
    /// survives the `debounce` window.
    fn register(&mut self, pin: u32, debounce: Duration, on_press: PressCallback) -> Result<()>;
}

/// Fixed pin to button table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMap {
    entries: [(u32, Button); 4],
}

impl ButtonMap {
    pub fn new(pins: &ButtonPins) -> Self {
        Self {
            entries: [
                (pins.a, Button::A),
                (pins.b, Button::B),
                (pins.c, Button::C),
                (pins.d, Button::D),
            ],
        }
    }

    pub fn button_for(&self, pin: u32) -> Option<Button> {
        self.entries
            .iter()
            .find_map(|&(p, button)| (p == pin).then_some(button))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Button)> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self::new(&ButtonPins::default())
    }
}

/// Drops edges that arrive within `window` of the last accepted one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last
            && now.saturating_duration_since(last) < self.window
        {
            debug!("debounced transition");
            return false;
        }
        self.last = Some(now);
        true
    }
}

/// Runs every press on its own blocking thread so a slow refresh never
/// stalls the input watcher or the scheduler.
#[derive(Clone)]
pub struct ButtonDispatcher {
    orchestrator: Arc<DisplayOrchestrator>,
    runtime: Handle,
}

impl ButtonDispatcher {
    pub fn new(orchestrator: Arc<DisplayOrchestrator>, runtime: Handle) -> Self {
        Self {
            orchestrator,
            runtime,
        }
    }

    pub fn dispatch(&self, button: Button) -> JoinHandle<Outcome> {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.runtime.spawn_blocking(move || {
            let outcome = orchestrator.handle_button(button);
            debug!(%button, ?outcome, "button handled");
            outcome
        })
    }

    /// Register a callback for every mapped pin.
    pub fn install(
        &self,
        input: &mut dyn InputCapability,
        map: &ButtonMap,
        debounce: Duration,
    ) -> Result<()> {
        for (pin, button) in map.iter() {
            let dispatcher = self.clone();
            input
                .register(
                    pin,
                    debounce,
                    Box::new(move || {
                        info!(pin, %button, "button press detected");
                        drop(dispatcher.dispatch(button));
                    }),
                )
                .with_context(|| format!("failed to watch pin {pin} for button {button}"))?;
        }
        info!("button handlers installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_uses_the_hat_pins() {
        let map = ButtonMap::default();
        assert_eq!(map.button_for(5), Some(Button::A));
        assert_eq!(map.button_for(6), Some(Button::B));
        assert_eq!(map.button_for(16), Some(Button::C));
        assert_eq!(map.button_for(24), Some(Button::D));
        assert_eq!(map.button_for(17), None);
    }

    #[test]
    fn debouncer_drops_bounces() {
        let mut debouncer = Debouncer::new(Duration::from_millis(250));
        let start = Instant::now();
        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_millis(40)));
        assert!(!debouncer.accept(start + Duration::from_millis(249)));
        assert!(debouncer.accept(start + Duration::from_millis(260)));
    }
}
