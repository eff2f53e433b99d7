//! Background backlog refill.
//!
//! Requests go through a bounded queue to one worker thread, so a burst of
//! button presses never spawns more than one fetch at a time. Each request
//! tops the backlog up to its target size, so a request dropped on a full
//! queue is covered by the one still pending.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, TrySendError, bounded};
use tracing::{debug, warn};

use crate::backlog::ImageBacklog;

/// Message sent to the refill thread.
enum RefillMsg {
    /// Bring the backlog back to its target size.
    TopUp,
}

#[derive(Clone)]
pub struct RefillWorker {
    tx: Sender<RefillMsg>,
}

impl RefillWorker {
    /// Spawn the worker. It exits once every handle has been dropped.
    pub fn spawn(backlog: Arc<ImageBacklog>, capacity: usize) -> Result<Self> {
        let (tx, rx) = bounded::<RefillMsg>(capacity.max(1));
        thread::Builder::new()
            .name("backlog-refill".into())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        RefillMsg::TopUp => {
                            let added = backlog.top_up();
                            debug!(added, size = backlog.len(), "refill finished");
                        }
                    }
                }
                debug!("refill worker stopped");
            })
            .context("failed to spawn refill worker")?;
        Ok(Self { tx })
    }

    /// Queue a refill. Returns `false` when the request was dropped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(RefillMsg::TopUp) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("refill already pending; dropping request");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("refill worker is gone; dropping request");
                false
            }
        }
    }
}
