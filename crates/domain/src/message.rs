//! Messages pushed to observers.
//!
//! `init` and `update` are what the control page understands:
//!
//! ```json
//! {"type": "init", "valves": [true, false, false]}
//! {"type": "update", "valve": 1, "status": true}
//! ```
//!
//! `auto` and `error` are additional; clients that only match on `init` and
//! `update` ignore them.

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType, StopReason};
use crate::id::ValveIndex;
use crate::valve::ValveState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full snapshot, in valve order.
    Init { valves: Vec<bool> },
    /// One valve changed.
    Update { valve: ValveIndex, status: bool },
    /// Auto-control started or stopped.
    Auto {
        active: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cycles: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<StopReason>,
    },
    /// A command from this client was rejected.
    Error { message: String },
}

impl ServerMessage {
    /// Translate a bus event into the message observers should see, if any.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        match event.event_type {
            EventType::ValveChanged => {
                let valve = event.valve?;
                let to: ValveState = serde_json::from_value(event.data.get("to")?.clone()).ok()?;
                Some(Self::Update {
                    valve,
                    status: to.is_open(),
                })
            }
            EventType::AutoStarted => Some(Self::Auto {
                active: true,
                duration: event.data.get("duration").and_then(serde_json::Value::as_f64),
                cycles: event
                    .data
                    .get("cycles")
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|c| u32::try_from(c).ok()),
                reason: None,
            }),
            EventType::AutoStopped => Some(Self::Auto {
                active: false,
                duration: None,
                cycles: None,
                reason: event
                    .data
                    .get("reason")
                    .cloned()
                    .and_then(|r| serde_json::from_value(r).ok()),
            }),
            EventType::ObserverConnected | EventType::ObserverDisconnected => None,
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
