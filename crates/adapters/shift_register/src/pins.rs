//! Digital output backends.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::GpioError;

/// A set of digital output lines.
pub trait PinBackend: Send {
    /// Claim `line` as an output and drive it to `high`.
    fn configure_output(&mut self, line: u32, high: bool) -> Result<(), GpioError>;

    /// Drive `line` high or low.
    fn write(&mut self, line: u32, high: bool) -> Result<(), GpioError>;
}

impl<T: PinBackend + ?Sized> PinBackend for Box<T> {
    fn configure_output(&mut self, line: u32, high: bool) -> Result<(), GpioError> {
        (**self).configure_output(line, high)
    }

    fn write(&mut self, line: u32, high: bool) -> Result<(), GpioError> {
        (**self).write(line, high)
    }
}

/// Linux sysfs GPIO (`/sys/class/gpio`).
#[derive(Debug, Clone)]
pub struct SysfsPins {
    base: PathBuf,
}

impl SysfsPins {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn line_path(&self, line: u32, leaf: &str) -> PathBuf {
        self.base.join(format!("gpio{line}")).join(leaf)
    }

    fn ensure_exported(&self, line: u32) -> Result<(), GpioError> {
        if self.base.join(format!("gpio{line}")).exists() {
            return Ok(());
        }
        tracing::debug!(line, "exporting gpio line");
        fs::write(self.base.join("export"), line.to_string())
            .map_err(|source| GpioError::Export { line, source })
    }

    fn write_path(path: &Path, value: &str) -> Result<(), GpioError> {
        fs::OpenOptions::new()
            .write(true)
            .open(path)
            .and_then(|mut file| file.write_all(value.as_bytes()))
            .map_err(|source| GpioError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl PinBackend for SysfsPins {
    fn configure_output(&mut self, line: u32, high: bool) -> Result<(), GpioError> {
        self.ensure_exported(line)?;
        Self::write_path(&self.line_path(line, "direction"), "out")?;
        self.write(line, high)
    }

    fn write(&mut self, line: u32, high: bool) -> Result<(), GpioError> {
        Self::write_path(&self.line_path(line, "value"), if high { "1" } else { "0" })
    }
}
