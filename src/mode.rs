//! Process-wide display mode and screenshot cursor.
//!
//! Both values are small enough to live in atomics. Handlers may observe a
//! mode from just before or after a concurrent switch; the worst case is one
//! extra or skipped render of the previous mode.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::events::Mode;

const CURSOR_UNSET: usize = usize::MAX;

#[derive(Debug)]
pub struct ModeState {
    mode: AtomicU8,
    cursor: AtomicUsize,
}

impl ModeState {
    pub fn new(initial: Mode) -> Self {
        Self {
            mode: AtomicU8::new(initial.as_u8()),
            cursor: AtomicUsize::new(CURSOR_UNSET),
        }
    }

    pub fn current(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: Mode) {
        self.mode.store(mode.as_u8(), Ordering::Release);
    }

    /// Commit Screenshots mode and forget the previous position so the next
    /// screenshot render starts at slot 0.
    pub fn enter_screenshots(&self) {
        self.cursor.store(CURSOR_UNSET, Ordering::Release);
        self.set(Mode::Screenshots);
    }

    pub fn cursor(&self) -> Option<usize> {
        match self.cursor.load(Ordering::Acquire) {
            CURSOR_UNSET => None,
            idx => Some(idx),
        }
    }

    /// Move the cursor to the next of `slots` screenshot slots and return it.
    pub fn advance_cursor(&self, slots: usize) -> usize {
        let step = |raw: usize| {
            let current = (raw != CURSOR_UNSET).then_some(raw);
            next_cursor(current, slots)
        };
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| Some(step(raw)))
            .unwrap_or_else(|raw| raw);
        step(previous)
    }
}

/// `unset -> 0`, otherwise `(idx + 1) mod slots`.
pub fn next_cursor(current: Option<usize>, slots: usize) -> usize {
    let slots = slots.max(1);
    match current {
        None => 0,
        Some(idx) => (idx + 1) % slots,
    }
}
