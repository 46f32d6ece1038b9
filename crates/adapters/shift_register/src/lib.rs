//! # valvehub-adapter-shift-register
//!
//! Hardware [`ValveDriver`](valvehub_app::ports::ValveDriver) for relay
//! boards fed by chained serial-in/parallel-out shift registers.
//!
//! Every write clocks the full relay word out on the data pin, most
//! significant bit first, between a falling and a rising edge of the latch
//! pin. The output-enable pin, when wired, is held low.
//!
//! ## Dependency rule
//!
//! Depends on `valvehub-app` (port traits) and `valvehub-domain` only.

pub mod config;
pub mod driver;
pub mod error;
pub mod pins;

pub use config::ShiftRegisterConfig;
pub use driver::{ShiftRegisterDriver, ShiftRegisterPins};
pub use error::GpioError;
pub use pins::{PinBackend, SysfsPins};
