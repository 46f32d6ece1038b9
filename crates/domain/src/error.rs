//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`ValveHubError`] via `#[from]` or an explicit `From` impl.

use std::error::Error as StdError;

/// Boxed source error produced by an adapter (storage, hardware, …).
pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level error shared by the domain, application, and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum ValveHubError {
    /// A domain invariant or input check failed.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A requested record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// Persistence failed.
    #[error("storage error")]
    Storage(#[source] BoxedError),

    /// Driving the valve outputs failed.
    #[error("hardware error")]
    Hardware(#[source] BoxedError),
}

/// Domain invariant violations and rejected input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A valve bank needs at least one valve.
    #[error("valve bank must contain at least one valve")]
    NoValves,

    /// Two valves were mapped to the same relay channel.
    #[error("relay channel {0} is assigned to more than one valve")]
    DuplicateChannel(u8),

    /// A valve index does not exist in the bank.
    #[error("valve {index} is out of range (bank has {count} valves)")]
    ValveOutOfRange { index: usize, count: usize },

    /// An auto-control duration could not be interpreted as positive minutes.
    #[error("invalid auto-control duration: {0}")]
    InvalidDuration(String),

    /// An auto-control duration exceeds the configured maximum.
    #[error("auto-control duration of {minutes} minutes exceeds the maximum of {max}")]
    DurationTooLong { minutes: f64, max: f64 },

    /// An incoming command could not be decoded.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// A path or query identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_via_from() {
        let err: ValveHubError = ValidationError::NoValves.into();
        assert!(matches!(
            err,
            ValveHubError::Validation(ValidationError::NoValves)
        ));
    }

    #[test]
    fn should_describe_out_of_range_valve() {
        let err = ValidationError::ValveOutOfRange {
            index: 12,
            count: 12,
        };
        assert_eq!(
            err.to_string(),
            "valve 12 is out of range (bank has 12 valves)"
        );
    }

    #[test]
    fn should_describe_not_found() {
        let err = NotFoundError {
            entity: "Event",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Event abc not found");
    }

    #[test]
    fn should_keep_hardware_source() {
        let io = std::io::Error::other("latch pin stuck");
        let err = ValveHubError::Hardware(Box::new(io));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("latch pin stuck"));
    }
}
