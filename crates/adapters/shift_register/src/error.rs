//! GPIO error types.

use std::path::PathBuf;

use valvehub_domain::error::ValveHubError;

/// Errors raised while driving the shift register.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// Exporting a line through sysfs failed.
    #[error("failed to export gpio {line}")]
    Export {
        line: u32,
        #[source]
        source: std::io::Error,
    },

    /// Writing a sysfs attribute failed.
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A channel does not fit in the register chain.
    #[error("channel {channel} does not fit a {width}-bit register chain")]
    ChannelOutOfRange { channel: u8, width: u8 },

    /// The register chain width is unusable.
    #[error("register width must be between 1 and 32, got {0}")]
    InvalidWidth(u8),
}

impl From<GpioError> for ValveHubError {
    fn from(err: GpioError) -> Self {
        Self::Hardware(Box::new(err))
    }
}
