//! Shift register valve driver.

use valvehub_app::ports::ValveDriver;
use valvehub_domain::error::ValveHubError;
use valvehub_domain::valve::ChannelState;

use crate::error::GpioError;
use crate::pins::PinBackend;

/// GPIO lines wired to the register chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftRegisterPins {
    pub latch: u32,
    pub clock: u32,
    pub data: u32,
    /// Active-low output enable; `None` when tied to ground on the board.
    pub output_enable: Option<u32>,
}

/// Drives relays through `width` bits of chained shift registers.
#[derive(Debug)]
pub struct ShiftRegisterDriver<B> {
    backend: B,
    pins: ShiftRegisterPins,
    width: u8,
    invert: bool,
}

impl<B: PinBackend> ShiftRegisterDriver<B> {
    /// Claim the pins and enable the register outputs.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::InvalidWidth`] unless `1 <= width <= 32`, or the
    /// backend error if a pin cannot be configured.
    pub fn new(mut backend: B, pins: ShiftRegisterPins, width: u8) -> Result<Self, GpioError> {
        if width == 0 || width > 32 {
            return Err(GpioError::InvalidWidth(width));
        }
        backend.configure_output(pins.latch, true)?;
        backend.configure_output(pins.clock, false)?;
        backend.configure_output(pins.data, false)?;
        if let Some(oe) = pins.output_enable {
            backend.configure_output(oe, false)?;
        }
        tracing::info!(
            latch = pins.latch,
            clock = pins.clock,
            data = pins.data,
            output_enable = ?pins.output_enable,
            width,
            "shift register ready"
        );
        Ok(Self {
            backend,
            pins,
            width,
            invert: false,
        })
    }

    /// Energize relays with a low bit instead of a high one.
    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Check that every channel fits the chain.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::ChannelOutOfRange`] for the first channel that
    /// does not.
    pub fn check_channels(&self, channels: &[u8]) -> Result<(), GpioError> {
        match channels.iter().find(|c| **c >= self.width) {
            Some(&channel) => Err(GpioError::ChannelOutOfRange {
                channel,
                width: self.width,
            }),
            None => Ok(()),
        }
    }

    /// Register word for an image, bit `n` driving relay channel `n`.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::ChannelOutOfRange`] for channels past the chain.
    pub fn word(&self, channels: &[ChannelState]) -> Result<u32, GpioError> {
        let mut word = 0u32;
        for state in channels {
            if state.channel >= self.width {
                return Err(GpioError::ChannelOutOfRange {
                    channel: state.channel,
                    width: self.width,
                });
            }
            if state.energized {
                word |= 1 << state.channel;
            }
        }
        if self.invert {
            word = !word & self.mask();
        }
        Ok(word)
    }

    fn mask(&self) -> u32 {
        u32::MAX >> (32 - u32::from(self.width))
    }

    fn shift_out(&mut self, word: u32) -> Result<(), GpioError> {
        self.backend.write(self.pins.latch, false)?;
        for bit in (0..self.width).rev() {
            self.backend.write(self.pins.data, (word >> bit) & 1 == 1)?;
            self.backend.write(self.pins.clock, true)?;
            self.backend.write(self.pins.clock, false)?;
        }
        self.backend.write(self.pins.latch, true)
    }
}

impl<B: PinBackend> ValveDriver for ShiftRegisterDriver<B> {
    fn name(&self) -> &'static str {
        "shift_register"
    }

    fn write(&mut self, channels: &[ChannelState]) -> Result<(), ValveHubError> {
        let word = self.word(channels)?;
        self.shift_out(word)?;
        tracing::trace!(word = format_args!("{word:#06x}"), "relay word latched");
        Ok(())
    }
}
