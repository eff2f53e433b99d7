//! Queue of decoded images ready for display.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::error::{BacklogError, RetryError, SupplyError};
use crate::retry::RetryPolicy;
use crate::supply::{ImageSupply, Photo};

/// FIFO of pre-fetched photos. The internal mutex is never held while the
/// supply is doing I/O.
pub struct ImageBacklog {
    queue: Mutex<VecDeque<Photo>>,
    supply: Arc<dyn ImageSupply>,
    target_size: usize,
}

impl ImageBacklog {
    pub fn new(supply: Arc<dyn ImageSupply>, target_size: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(target_size)),
            supply,
            target_size: target_size.max(1),
        }
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// Fill the backlog with `target_size` images, retrying per `policy`.
    pub fn initialize(&self, policy: &RetryPolicy) -> Result<(), RetryError<SupplyError>> {
        let photos = policy.run("initial backlog population", || {
            self.supply.random_images(self.target_size)
        })?;
        let mut queue = self.queue();
        queue.extend(photos);
        info!(size = queue.len(), "backlog populated");
        Ok(())
    }

    /// Remove the oldest photo. An empty backlog is repopulated synchronously
    /// before giving up.
    pub fn take_one(&self) -> Result<Photo, BacklogError> {
        if let Some(photo) = self.queue().pop_front() {
            return Ok(photo);
        }

        error!("tried to show the next photo but the backlog was empty");
        info!(count = self.target_size, "repopulating the backlog");
        let photos = self.supply.random_images(self.target_size)?;

        let mut queue = self.queue();
        queue.extend(photos);
        queue.pop_front().ok_or(BacklogError::Exhausted)
    }

    /// Append one fresh photo. Failures are logged and leave the backlog as it
    /// was.
    pub fn refill_one(&self) -> bool {
        match self.supply.random_image() {
            Ok(photo) => {
                let mut queue = self.queue();
                queue.push_back(photo);
                info!(size = queue.len(), "queued one more photo");
                true
            }
            Err(err) => {
                warn!(size = self.len(), "failed to queue photo: {err}");
                false
            }
        }
    }

    /// Refill one photo at a time until the backlog is back at its target
    /// size. Stops at the first failure; returns how many photos were added.
    pub fn top_up(&self) -> usize {
        let mut added = 0;
        while self.len() < self.target_size {
            if !self.refill_one() {
                break;
            }
            added += 1;
        }
        added
    }

    /// Hand a consumed photo back to the supply for cleanup.
    pub fn release(&self, photo: Photo) {
        self.supply.release(photo);
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Photo>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
