use std::process::Command;

use tracing::{info, warn};

use crate::error::PowerError;

/// Host shutdown capability.
pub trait HostPower: Send + Sync {
    fn power_off(&self) -> Result<(), PowerError>;
}

/// Runs a shell command (normally `systemctl poweroff`) as root.
#[derive(Debug, Clone)]
pub struct SystemPower {
    command: String,
}

impl SystemPower {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl HostPower for SystemPower {
    fn power_off(&self) -> Result<(), PowerError> {
        // SAFETY: geteuid has no preconditions and cannot fail.
        let euid = unsafe { libc::geteuid() };
        if euid != 0 {
            warn!(euid, "refusing to power off without root privileges");
            return Err(PowerError::NotPrivileged);
        }
        info!(command = %self.command, "powering off the host");
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .map_err(|source| PowerError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(PowerError::Command {
                command: self.command.clone(),
                status,
            })
        }
    }
}
