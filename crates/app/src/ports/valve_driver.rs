//! Valve driver port — pushes the relay image to the output hardware.

use valvehub_domain::error::ValveHubError;
use valvehub_domain::valve::ChannelState;

/// Output stage that energizes relay channels.
///
/// Each call carries the complete image for every valve in the bank;
/// drivers may assume channels they are not told about stay de-energized.
/// Writes are short and synchronous, and are always issued while the
/// valve registry holds its lock.
pub trait ValveDriver: Send {
    /// Short identifier used in logs (e.g. `"virtual"`).
    fn name(&self) -> &'static str;

    /// Drive the given channel levels.
    ///
    /// # Errors
    ///
    /// Returns [`ValveHubError::Hardware`] when the outputs could not be
    /// written. The caller treats the hardware state as unchanged.
    fn write(&mut self, channels: &[ChannelState]) -> Result<(), ValveHubError>;
}

impl<T: ValveDriver + ?Sized> ValveDriver for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn write(&mut self, channels: &[ChannelState]) -> Result<(), ValveHubError> {
        (**self).write(channels)
    }
}
