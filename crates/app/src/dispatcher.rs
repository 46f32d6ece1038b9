//! Command dispatcher — validates client commands and applies them.

use std::sync::Arc;

use serde::Serialize;

use valvehub_domain::command::Command;
use valvehub_domain::error::ValveHubError;
use valvehub_domain::event::{ChangeOrigin, StopReason};
use valvehub_domain::valve::ValveChange;

use crate::auto_control::{AutoControl, AutoPlan, AutoStatus};
use crate::ports::{EventPublisher, ValveDriver};
use crate::services::valve_service::ValveService;

/// Bounds applied to `startAuto` commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchLimits {
    /// Longest accepted dwell, in minutes.
    pub max_duration_minutes: f64,
    /// Passes used when a `startAuto` command carries no `cycles`.
    pub default_cycles: u32,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_duration_minutes: 24.0 * 60.0,
            default_cycles: 1,
        }
    }
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// A toggle was applied; lists valves that changed.
    Switched { changes: Vec<ValveChange> },
    /// Auto-control is now running.
    AutoStarted { status: AutoStatus },
    /// Auto-control was asked to stop.
    AutoStopped { was_active: bool },
}

/// Entry point for every control command, whatever transport it came over.
pub struct CommandDispatcher<D, P> {
    valves: Arc<ValveService<D, P>>,
    auto: AutoControl<D, P>,
    limits: DispatchLimits,
}

impl<D, P> CommandDispatcher<D, P>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    pub fn new(valves: Arc<ValveService<D, P>>, limits: DispatchLimits) -> Self {
        Self {
            auto: AutoControl::new(Arc::clone(&valves)),
            valves,
            limits,
        }
    }

    /// Valve registry backing this dispatcher.
    #[must_use]
    pub fn valves(&self) -> &ValveService<D, P> {
        &self.valves
    }

    /// Auto-control timer backing this dispatcher.
    #[must_use]
    pub fn auto(&self) -> &AutoControl<D, P> {
        &self.auto
    }

    /// Validate and apply a command.
    ///
    /// A `toggle` while auto-control runs stops the run with
    /// [`StopReason::ManualOverride`] before switching. An out-of-range
    /// toggle is rejected before the run is touched.
    ///
    /// # Errors
    ///
    /// Returns [`ValveHubError::Validation`] for bad input and
    /// [`ValveHubError::Hardware`] when the driver fails.
    pub async fn dispatch(&self, command: Command) -> Result<CommandOutcome, ValveHubError> {
        tracing::debug!(command = command.kind(), "dispatching command");
        match command {
            Command::Toggle { valve } => {
                self.valves.check_index(valve)?;
                self.auto.stop(StopReason::ManualOverride).await;
                let changes = self.valves.select(valve, ChangeOrigin::Manual).await?;
                Ok(CommandOutcome::Switched { changes })
            }
            Command::StartAuto { duration, cycles } => {
                let dwell = duration.to_dwell(self.limits.max_duration_minutes)?;
                let plan = AutoPlan {
                    dwell,
                    duration_minutes: duration.minutes(),
                    cycles: cycles.unwrap_or(self.limits.default_cycles),
                };
                let status = self.auto.start(plan).await;
                Ok(CommandOutcome::AutoStarted { status })
            }
            Command::StopAuto => {
                let was_active = self.auto.stop(StopReason::Requested).await;
                Ok(CommandOutcome::AutoStopped { was_active })
            }
        }
    }

    /// Stop auto-control for shutdown.
    pub async fn shutdown(&self) {
        if self.auto.stop(StopReason::Shutdown).await {
            tracing::info!("auto-control stopped for shutdown");
        }
    }
}
