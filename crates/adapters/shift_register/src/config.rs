//! Shift register driver configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::driver::{ShiftRegisterDriver, ShiftRegisterPins};
use crate::error::GpioError;
use crate::pins::SysfsPins;

/// Wiring of the relay board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShiftRegisterConfig {
    /// Storage register clock (latch) line.
    pub latch_pin: u32,
    /// Shift register clock line.
    pub clock_pin: u32,
    /// Serial data line.
    pub data_pin: u32,
    /// Active-low output enable line, if wired.
    pub output_enable_pin: Option<u32>,
    /// Bits in the register chain (8 per register).
    pub width: u8,
    /// Energize relays with a low bit.
    pub invert: bool,
    /// Root of the sysfs GPIO tree.
    pub sysfs_base: PathBuf,
}

impl Default for ShiftRegisterConfig {
    fn default() -> Self {
        Self {
            latch_pin: 12,
            clock_pin: 13,
            data_pin: 14,
            output_enable_pin: Some(5),
            width: 16,
            invert: false,
            sysfs_base: PathBuf::from("/sys/class/gpio"),
        }
    }
}

impl ShiftRegisterConfig {
    #[must_use]
    pub fn pins(&self) -> ShiftRegisterPins {
        ShiftRegisterPins {
            latch: self.latch_pin,
            clock: self.clock_pin,
            data: self.data_pin,
            output_enable: self.output_enable_pin,
        }
    }

    /// Open the sysfs-backed driver described by this config.
    ///
    /// # Errors
    ///
    /// Returns a [`GpioError`] if the width is invalid or a line cannot be
    /// configured.
    pub fn open(&self) -> Result<ShiftRegisterDriver<SysfsPins>, GpioError> {
        let backend = SysfsPins::new(self.sysfs_base.clone());
        Ok(ShiftRegisterDriver::new(backend, self.pins(), self.width)?.inverted(self.invert))
    }
}
