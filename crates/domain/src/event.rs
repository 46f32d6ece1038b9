//! Event — an immutable record of something that happened.
//!
//! Events are produced when a valve changes state, when auto-control starts
//! or stops, and when observers come and go. They flow through the event bus
//! to connected observers and into the event store.

use serde::{Deserialize, Serialize};

use crate::id::{EventId, RunId, ValveIndex};
use crate::time::{Timestamp, now};
use crate::valve::ValveChange;

/// Kind of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ValveChanged,
    AutoStarted,
    AutoStopped,
    ObserverConnected,
    ObserverDisconnected,
}

impl EventType {
    /// Stable snake-case name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValveChanged => "valve_changed",
            Self::AutoStarted => "auto_started",
            Self::AutoStopped => "auto_stopped",
            Self::ObserverConnected => "observer_connected",
            Self::ObserverDisconnected => "observer_disconnected",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valve_changed" => Ok(Self::ValveChanged),
            "auto_started" => Ok(Self::AutoStarted),
            "auto_stopped" => Ok(Self::AutoStopped),
            "observer_connected" => Ok(Self::ObserverConnected),
            "observer_disconnected" => Ok(Self::ObserverDisconnected),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

/// Returned when parsing an unrecognised event type name.
#[derive(Debug, thiserror::Error)]
#[error("unknown event type {0:?}")]
pub struct UnknownEventType(pub String);

/// What caused a valve to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    Startup,
    Manual,
    Automatic,
}

/// Why an auto-control run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A client sent `stopAuto`, or a new run replaced this one.
    Requested,
    /// All planned cycles ran to the end.
    Completed,
    /// A manual toggle took over.
    ManualOverride,
    /// The valve driver failed mid-run.
    Fault,
    /// The daemon is shutting down.
    Shutdown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Requested => "requested",
            Self::Completed => "completed",
            Self::ManualOverride => "manual_override",
            Self::Fault => "fault",
            Self::Shutdown => "shutdown",
        })
    }
}

/// A recorded occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub valve: Option<ValveIndex>,
    pub timestamp: Timestamp,
    pub data: serde_json::Value,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, valve: Option<ValveIndex>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            valve,
            timestamp: now(),
            data,
        }
    }

    #[must_use]
    pub fn valve_changed(change: ValveChange, origin: ChangeOrigin) -> Self {
        Self::new(
            EventType::ValveChanged,
            Some(change.valve),
            serde_json::json!({
                "from": change.from,
                "to": change.to,
                "origin": origin,
            }),
        )
    }

    #[must_use]
    pub fn auto_started(run: RunId, duration_minutes: f64, cycles: u32) -> Self {
        Self::new(
            EventType::AutoStarted,
            None,
            serde_json::json!({
                "run_id": run,
                "duration": duration_minutes,
                "cycles": cycles,
            }),
        )
    }

    #[must_use]
    pub fn auto_stopped(run: RunId, reason: StopReason) -> Self {
        Self::new(
            EventType::AutoStopped,
            None,
            serde_json::json!({
                "run_id": run,
                "reason": reason,
            }),
        )
    }

    #[must_use]
    pub fn observer(connected: bool, observer: u64) -> Self {
        let event_type = if connected {
            EventType::ObserverConnected
        } else {
            EventType::ObserverDisconnected
        };
        Self::new(event_type, None, serde_json::json!({ "observer": observer }))
    }
}
