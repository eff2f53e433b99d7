use std::fmt;

use serde::Deserialize;

/// Logical identity of a physical button on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    C,
    D,
}

impl Button {
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The exclusive display behaviour currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Cycle through the captured dashboard screenshots.
    #[default]
    Screenshots,
    /// Show photos from the image backlog.
    GooglePhotos,
    /// Manual-only diagnostics screen; the scheduler leaves it alone.
    Debugging,
}

impl Mode {
    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Self::Screenshots => 0,
            Self::GooglePhotos => 1,
            Self::Debugging => 2,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::GooglePhotos,
            2 => Self::Debugging,
            _ => Self::Screenshots,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Screenshots => "screenshots",
            Self::GooglePhotos => "google-photos",
            Self::Debugging => "debugging",
        })
    }
}

/// What a single pipeline invocation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A frame was written to the display.
    Shown,
    /// The screen was busy and the request was dropped.
    SkippedBusy,
    /// The expected screenshot file does not exist; the display is unchanged.
    ScreenshotMissing,
    /// Nothing to do (debugging mode tick, duplicate power-off request).
    Idle,
    PoweredOff,
    PowerOffFailed,
    /// The pipeline failed; the error has been logged.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_atomic_repr() {
        for mode in [Mode::Screenshots, Mode::GooglePhotos, Mode::Debugging] {
            assert_eq!(Mode::from_u8(mode.as_u8()), mode);
        }
    }

    #[test]
    fn mode_parses_kebab_case() {
        let mode: Mode = serde_yaml::from_str("google-photos").unwrap();
        assert_eq!(mode, Mode::GooglePhotos);
    }
}
