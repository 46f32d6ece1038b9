//! Commands sent by control clients.
//!
//! Wire shapes:
//!
//! ```json
//! {"type": "toggle", "valve": 3}
//! {"type": "startAuto", "duration": "15"}
//! {"type": "stopAuto"}
//! ```
//!
//! `duration` is in minutes. Browser forms submit it as a string, scripts as
//! a number; both are accepted. `startAuto` may also carry `cycles`, the
//! number of passes over the bank (`0` repeats until stopped).

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ValidationError, ValveHubError};
use crate::id::ValveIndex;

/// A control command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Open one valve, closing all others.
    Toggle { valve: ValveIndex },
    /// Start automatic cycling with the given dwell per valve.
    StartAuto {
        duration: AutoDuration,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cycles: Option<u32>,
    },
    /// Stop automatic cycling.
    StopAuto,
}

impl Command {
    /// Decode a command from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedCommand`] when the payload is not
    /// valid JSON or not a known command shape.
    pub fn parse(text: &str) -> Result<Self, ValveHubError> {
        serde_json::from_str(text)
            .map_err(|err| ValidationError::MalformedCommand(err.to_string()).into())
    }

    /// Wire name of the command, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Toggle { .. } => "toggle",
            Self::StartAuto { .. } => "startAuto",
            Self::StopAuto => "stopAuto",
        }
    }
}

/// Auto-control dwell time in minutes, as entered by the user.
///
/// Not validated on decode; see [`AutoDuration::to_dwell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoDuration(f64);

impl AutoDuration {
    #[must_use]
    pub fn from_minutes(minutes: f64) -> Self {
        Self(minutes)
    }

    #[must_use]
    pub fn minutes(self) -> f64 {
        self.0
    }

    /// Convert to a dwell duration, enforcing `0 < minutes <= max_minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDuration`] for non-finite,
    /// non-positive, or sub-nanosecond values and [`ValidationError::DurationTooLong`] above
    /// the limit.
    pub fn to_dwell(self, max_minutes: f64) -> Result<Duration, ValveHubError> {
        let minutes = self.0;
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(ValidationError::InvalidDuration(minutes.to_string()).into());
        }
        if minutes > max_minutes {
            return Err(ValidationError::DurationTooLong {
                minutes,
                max: max_minutes,
            }
            .into());
        }
        match Duration::try_from_secs_f64(minutes * 60.0) {
            Ok(dwell) if !dwell.is_zero() => Ok(dwell),
            _ => Err(ValidationError::InvalidDuration(minutes.to_string()).into()),
        }
    }
}

impl Serialize for AutoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for AutoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(minutes) => Ok(Self(minutes)),
            Raw::Text(text) => text.trim().parse::<f64>().map(Self).map_err(|_| {
                serde::de::Error::custom(format!("duration {text:?} is not a number"))
            }),
        }
    }
}
