use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures raised while writing a frame through the screen lock.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// The frame does not match the panel's native resolution.
    #[error("frame is {actual:?} but the display expects {expected:?}")]
    ResolutionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The display driver rejected the write.
    #[error("display driver error")]
    Driver(#[source] anyhow::Error),
}

/// Failures reported by an image supply. All of them are treated as transient.
#[derive(Debug, Error)]
pub enum SupplyError {
    /// The library directory holds no displayable images.
    #[error("no images found under {0}")]
    EmptyLibrary(PathBuf),

    /// A chosen file could not be decoded.
    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The source is temporarily unreachable.
    #[error("image source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum BacklogError {
    /// The supply answered a repopulation request with zero images.
    #[error("image supply returned no images while repopulating the backlog")]
    Exhausted,

    #[error("failed to repopulate the backlog")]
    Supply(#[from] SupplyError),
}

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("power-off requires root privileges")]
    NotPrivileged,

    #[error("failed to spawn power-off command '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("power-off command '{command}' exited with {status}")]
    Command { command: String, status: ExitStatus },
}

/// Returned by a bounded retry once every attempt has failed.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempts")]
pub struct RetryError<E: std::error::Error + 'static> {
    pub operation: &'static str,
    pub attempts: u32,
    #[source]
    pub last: E,
}
