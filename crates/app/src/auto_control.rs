//! Auto-control — timed cycling through the valve bank.
//!
//! A run opens valve 0 immediately, then advances to the next valve every
//! `dwell`, wrapping at the end of the bank. After `cycles` full passes and
//! one last dwell the run ends by itself and control is back in manual
//! mode; the last valve stays open. `cycles == 0` runs until stopped.
//!
//! At most one run exists at a time. Starting a new run replaces the
//! current one.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use valvehub_domain::event::{ChangeOrigin, Event, StopReason};
use valvehub_domain::id::RunId;
use valvehub_domain::time::{Timestamp, after, now};

use crate::ports::{EventPublisher, ValveDriver};
use crate::services::valve_service::ValveService;

/// Parameters of one auto-control run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoPlan {
    /// Time each valve stays open.
    pub dwell: Duration,
    /// The dwell as requested, in minutes.
    pub duration_minutes: f64,
    /// Full passes over the bank; `0` means unbounded.
    pub cycles: u32,
}

impl AutoPlan {
    /// Number of valve steps in the run, `None` when unbounded.
    #[must_use]
    pub fn total_steps(&self, valve_count: usize) -> Option<u64> {
        if self.cycles == 0 {
            return None;
        }
        let valves = u64::try_from(valve_count).unwrap_or(u64::MAX);
        Some(valves.saturating_mul(u64::from(self.cycles)))
    }

    /// Wall time from start to completion, `None` when unbounded.
    #[must_use]
    pub fn total_runtime(&self, valve_count: usize) -> Option<Duration> {
        let steps = self.total_steps(valve_count)?;
        let steps = u32::try_from(steps).unwrap_or(u32::MAX);
        Some(self.dwell.saturating_mul(steps))
    }
}

/// Snapshot of the auto-control state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<Timestamp>,
}

impl AutoStatus {
    fn idle() -> Self {
        Self {
            active: false,
            run_id: None,
            duration_minutes: None,
            cycles: None,
            started_at: None,
            ends_at: None,
        }
    }
}

struct ActiveRun {
    id: RunId,
    plan: AutoPlan,
    started_at: Timestamp,
    handle: JoinHandle<()>,
}

impl ActiveRun {
    fn status(&self, valve_count: usize) -> AutoStatus {
        AutoStatus {
            active: true,
            run_id: Some(self.id),
            duration_minutes: Some(self.plan.duration_minutes),
            cycles: Some(self.plan.cycles),
            started_at: Some(self.started_at),
            ends_at: self
                .plan
                .total_runtime(valve_count)
                .map(|runtime| after(self.started_at, runtime)),
        }
    }
}

type Slot = Arc<Mutex<Option<ActiveRun>>>;

/// Owns the (at most one) running auto-control task.
pub struct AutoControl<D, P> {
    valves: Arc<ValveService<D, P>>,
    slot: Slot,
}

impl<D, P> AutoControl<D, P>
where
    D: ValveDriver + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    pub fn new(valves: Arc<ValveService<D, P>>) -> Self {
        Self {
            valves,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a run, replacing any run in progress.
    ///
    /// The replaced run is reported as stopped with
    /// [`StopReason::Requested`] before the new run is announced.
    pub async fn start(&self, plan: AutoPlan) -> AutoStatus {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            self.terminate(previous, StopReason::Requested).await;
        }

        let id = RunId::new();
        publish_logged(
            &self.valves,
            Event::auto_started(id, plan.duration_minutes, plan.cycles),
        )
        .await;
        tracing::info!(
            run = %id,
            duration_minutes = plan.duration_minutes,
            cycles = plan.cycles,
            "auto-control started"
        );

        let handle = tokio::spawn(drive(
            Arc::clone(&self.valves),
            Arc::clone(&self.slot),
            id,
            plan,
        ));
        let run = ActiveRun {
            id,
            plan,
            started_at: now(),
            handle,
        };
        let status = run.status(self.valves.valve_count());
        *slot = Some(run);
        status
    }

    /// Stop the current run.
    ///
    /// Returns `false` (and publishes nothing) when no run was active.
    pub async fn stop(&self, reason: StopReason) -> bool {
        let mut slot = self.slot.lock().await;
        match slot.take() {
            Some(run) => {
                self.terminate(run, reason).await;
                true
            }
            None => false,
        }
    }

    /// Whether a run is in progress.
    pub async fn is_active(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub async fn status(&self) -> AutoStatus {
        self.slot
            .lock()
            .await
            .as_ref()
            .map_or_else(AutoStatus::idle, |run| {
                run.status(self.valves.valve_count())
            })
    }

    /// Abort the task and wait for it to unwind before announcing the stop,
    /// so no step of the old run lands after its stop event.
    async fn terminate(&self, run: ActiveRun, reason: StopReason) {
        run.handle.abort();
        if let Err(err) = run.handle.await {
            if !err.is_cancelled() {
                tracing::error!(run = %run.id, error = %err, "auto-control task panicked");
            }
        }
        publish_logged(&self.valves, Event::auto_stopped(run.id, reason)).await;
        tracing::info!(run = %run.id, %reason, "auto-control stopped");
    }
}

async fn drive<D, P>(valves: Arc<ValveService<D, P>>, slot: Slot, id: RunId, plan: AutoPlan)
where
    D: ValveDriver,
    P: EventPublisher + Send + Sync,
{
    let valve_count = valves.valve_count();
    let total_steps = plan.total_steps(valve_count);
    let wrap = u64::try_from(valve_count).unwrap_or(u64::MAX).max(1);

    let mut ticker = tokio::time::interval(plan.dwell);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut step: u64 = 0;
    let reason = loop {
        ticker.tick().await;
        if total_steps.is_some_and(|total| step >= total) {
            break StopReason::Completed;
        }

        let valve = usize::try_from(step % wrap).unwrap_or_default();
        if let Err(err) = valves.select(valve, ChangeOrigin::Automatic).await {
            tracing::error!(run = %id, valve, error = %err, "auto-control step failed");
            break StopReason::Fault;
        }
        tracing::debug!(run = %id, valve, step, "auto-control step");
        step += 1;
    };

    let mut slot = slot.lock().await;
    if slot.as_ref().is_some_and(|run| run.id == id) {
        *slot = None;
        publish_logged(&valves, Event::auto_stopped(id, reason)).await;
        tracing::info!(run = %id, %reason, steps = step, "auto-control finished");
    }
}

async fn publish_logged<D, P>(valves: &ValveService<D, P>, event: Event)
where
    D: ValveDriver,
    P: EventPublisher + Send + Sync,
{
    if let Err(err) = valves.publish(event).await {
        tracing::warn!(error = %err, "failed to publish auto-control event");
    }
}
