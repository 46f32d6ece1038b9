//! Valve service — the authoritative valve registry.

use tokio::sync::Mutex;

use valvehub_domain::error::{NotFoundError, ValveHubError};
use valvehub_domain::event::{ChangeOrigin, Event};
use valvehub_domain::id::ValveIndex;
use valvehub_domain::time::now;
use valvehub_domain::valve::{self, Valve, ValveBank, ValveChange, ValveState};

use crate::ports::{EventPublisher, ValveDriver};

struct Registry<D> {
    bank: ValveBank,
    driver: D,
}

/// Holds valve state and keeps the output hardware in step with it.
///
/// State and driver share one lock: a change is committed only once the
/// driver accepted the new image, and its events are published before the
/// lock is released so observers see changes in the order they happened.
pub struct ValveService<D, P> {
    registry: Mutex<Registry<D>>,
    valve_count: usize,
    publisher: P,
}

impl<D, P> ValveService<D, P>
where
    D: ValveDriver,
    P: EventPublisher + Send + Sync,
{
    /// Create a new service around a validated bank.
    pub fn new(bank: ValveBank, driver: D, publisher: P) -> Self {
        Self {
            valve_count: bank.len(),
            registry: Mutex::new(Registry { bank, driver }),
            publisher,
        }
    }

    /// Number of valves in the bank.
    #[must_use]
    pub fn valve_count(&self) -> usize {
        self.valve_count
    }

    /// Drive the initial image and announce every valve's state.
    ///
    /// # Errors
    ///
    /// Returns [`ValveHubError::Hardware`] if the driver rejects the image.
    pub async fn initialize(&self) -> Result<(), ValveHubError> {
        let mut registry = self.registry.lock().await;
        let image = registry.bank.channel_states();
        registry.driver.write(&image)?;
        tracing::info!(
            driver = registry.driver.name(),
            valves = self.valve_count,
            open = registry.bank.open_valve(),
            "valve outputs initialised"
        );

        for valve in registry.bank.valves() {
            let change = ValveChange {
                valve: valve.index,
                from: ValveState::Closed,
                to: valve.state,
            };
            self.publisher
                .publish(Event::valve_changed(change, ChangeOrigin::Startup))
                .await?;
        }
        Ok(())
    }

    /// Open/closed flags in valve order.
    pub async fn snapshot(&self) -> Vec<bool> {
        self.registry.lock().await.bank.states()
    }

    /// All valves with metadata.
    pub async fn valves(&self) -> Vec<Valve> {
        self.registry.lock().await.bank.valves().to_vec()
    }

    /// Look up one valve.
    ///
    /// # Errors
    ///
    /// Returns [`ValveHubError::NotFound`] when `index` is out of range.
    pub async fn get(&self, index: ValveIndex) -> Result<Valve, ValveHubError> {
        self.registry
            .lock()
            .await
            .bank
            .get(index)
            .cloned()
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Valve",
                    id: index.to_string(),
                }
                .into()
            })
    }

    /// Validate a valve index without taking the lock.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ValveOutOfRange`](valvehub_domain::error::ValidationError::ValveOutOfRange).
    pub fn check_index(&self, index: ValveIndex) -> Result<(), ValveHubError> {
        valve::check_index(index, self.valve_count)
    }

    /// Open `index` exclusively.
    ///
    /// Returns the valves that changed; empty when `index` was already the
    /// open valve, in which case the driver is not touched.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown index, or
    /// [`ValveHubError::Hardware`] if the driver failed; in the latter case
    /// the registry keeps its previous state.
    pub async fn select(
        &self,
        index: ValveIndex,
        origin: ChangeOrigin,
    ) -> Result<Vec<ValveChange>, ValveHubError> {
        let mut registry = self.registry.lock().await;
        let previous = registry.bank.clone();

        let changes = registry.bank.select(index, now())?;
        if changes.is_empty() {
            return Ok(changes);
        }

        let image = registry.bank.channel_states();
        if let Err(err) = registry.driver.write(&image) {
            tracing::error!(valve = index, ?origin, error = %err, "failed to drive valve outputs");
            registry.bank = previous;
            return Err(err);
        }
        tracing::info!(valve = index, ?origin, "valve opened");

        for change in &changes {
            self.publisher
                .publish(Event::valve_changed(*change, origin))
                .await?;
        }
        Ok(changes)
    }

    /// Publish an event through the service's publisher.
    ///
    /// # Errors
    ///
    /// Propagates publisher failures.
    pub async fn publish(&self, event: Event) -> Result<(), ValveHubError> {
        self.publisher.publish(event).await
    }
}
