//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `valvehub.toml` in the working directory, or the file named by
//! `VALVEHUB_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::PathBuf;

use serde::Deserialize;

use valvehub_adapter_shift_register::ShiftRegisterConfig;
use valvehub_app::dispatcher::DispatchLimits;
use valvehub_domain::error::ValveHubError;
use valvehub_domain::id::ValveIndex;
use valvehub_domain::valve::{DEFAULT_CHANNELS, ValveBank};

const DEFAULT_PATH: &str = "valvehub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Valve bank layout.
    pub valves: ValvesConfig,
    /// Auto-control limits.
    pub auto: AutoConfig,
    /// Output hardware.
    pub driver: DriverConfig,
    /// Event bus sizing.
    pub bus: BusConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Directory holding the control page; not served when unset.
    pub ui_dir: Option<PathBuf>,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Valve bank layout.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ValvesConfig {
    /// Relay channel of each valve, in valve order.
    pub channels: Vec<u8>,
    /// Display names; missing entries are generated.
    pub names: Vec<String>,
    /// Valve opened at startup.
    pub initial_open: ValveIndex,
}

/// Auto-control limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutoConfig {
    /// Longest accepted dwell per valve, in minutes.
    pub max_duration_minutes: f64,
    /// Passes over the bank when a command does not say.
    pub default_cycles: u32,
}

/// Which valve driver to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// In-memory outputs; nothing is switched.
    #[default]
    Virtual,
    /// Chained shift registers over sysfs GPIO.
    ShiftRegister,
}

/// Output hardware configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub kind: DriverKind,
    /// Wiring used when `kind = "shift_register"`.
    pub shift_register: ShiftRegisterConfig,
}

/// Event bus configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Events buffered per subscriber before it lags.
    pub capacity: usize,
}

impl Config {
    /// Load configuration from `valvehub.toml` (or `VALVEHUB_CONFIG`), then
    /// apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("VALVEHUB_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("VALVEHUB_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("VALVEHUB_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("VALVEHUB_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("VALVEHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("VALVEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus capacity must be non-zero".to_string(),
            ));
        }
        let max = self.auto.max_duration_minutes;
        if !max.is_finite() || max <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "auto.max_duration_minutes must be positive, got {max}"
            )));
        }
        self.valve_bank()?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Build the valve bank described by `[valves]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bank`] when the layout is invalid.
    pub fn valve_bank(&self) -> Result<ValveBank, ConfigError> {
        ValveBank::builder()
            .channels(self.valves.channels.clone())
            .names(self.valves.names.iter().cloned())
            .initial_open(self.valves.initial_open)
            .build()
            .map_err(ConfigError::Bank)
    }

    #[must_use]
    pub fn dispatch_limits(&self) -> DispatchLimits {
        DispatchLimits {
            max_duration_minutes: self.auto.max_duration_minutes,
            default_cycles: self.auto.default_cycles,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ui_dir: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:valvehub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "valvehub=info,valvehubd=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ValvesConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS.to_vec(),
            names: Vec::new(),
            initial_open: 0,
        }
    }
}

impl Default for AutoConfig {
    fn default() -> Self {
        let limits = DispatchLimits::default();
        Self {
            max_duration_minutes: limits.max_duration_minutes,
            default_cycles: limits.default_cycles,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// The `[valves]` section does not describe a usable bank.
    #[error("invalid valve layout")]
    Bank(#[source] ValveHubError),
}
