//! # valvehub-adapter-virtual
//!
//! In-memory [`ValveDriver`] used when no relay board is attached.
//!
//! The driver remembers the last image it was given. A [`VirtualHandle`]
//! cloned from it lets tests and the development server inspect that image
//! and inject write failures.
//!
//! ## Dependency rule
//!
//! Depends on `valvehub-app` (port traits) and `valvehub-domain` only.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use valvehub_app::ports::ValveDriver;
use valvehub_domain::error::ValveHubError;
use valvehub_domain::valve::ChannelState;

/// Error returned while a failure is injected.
#[derive(Debug, thiserror::Error)]
#[error("virtual relay board is offline")]
pub struct VirtualFault;

#[derive(Debug, Default)]
struct Outputs {
    image: Vec<ChannelState>,
    writes: usize,
    offline: bool,
}

/// Simulated relay board.
#[derive(Debug, Default)]
pub struct VirtualValveDriver {
    outputs: Arc<Mutex<Outputs>>,
}

impl VirtualValveDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle observing this driver.
    #[must_use]
    pub fn handle(&self) -> VirtualHandle {
        VirtualHandle {
            outputs: Arc::clone(&self.outputs),
        }
    }
}

impl ValveDriver for VirtualValveDriver {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn write(&mut self, channels: &[ChannelState]) -> Result<(), ValveHubError> {
        let mut outputs = lock(&self.outputs);
        if outputs.offline {
            return Err(ValveHubError::Hardware(Box::new(VirtualFault)));
        }
        outputs.image = channels.to_vec();
        outputs.writes += 1;
        tracing::debug!(
            energized = ?energized_of(&outputs.image),
            "virtual outputs written"
        );
        Ok(())
    }
}

/// Cloneable view into a [`VirtualValveDriver`].
#[derive(Debug, Clone)]
pub struct VirtualHandle {
    outputs: Arc<Mutex<Outputs>>,
}

impl VirtualHandle {
    /// Last image written, empty before the first write.
    #[cfg(test)]
    fn image(&self) -> Vec<ChannelState> {
        lock(&self.outputs).image.clone()
    }

    /// Channels energized by the last write.
    #[must_use]
    pub fn energized(&self) -> Vec<u8> {
        energized_of(&lock(&self.outputs).image)
    }

    /// Number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        lock(&self.outputs).writes
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        lock(&self.outputs).offline = offline;
    }
}

fn energized_of(image: &[ChannelState]) -> Vec<u8> {
    image
        .iter()
        .filter(|c| c.energized)
        .map(|c| c.channel)
        .collect()
}

fn lock(outputs: &Mutex<Outputs>) -> MutexGuard<'_, Outputs> {
    outputs.lock().unwrap_or_else(PoisonError::into_inner)
}
