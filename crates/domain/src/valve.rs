//! Valves and the valve bank.
//!
//! A bank is an ordered set of binary valves, each wired to one relay
//! channel of the output hardware. The bank enforces the irrigation rule
//! that exactly one valve is open at any time: opening a valve closes
//! every other one.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValveHubError};
use crate::id::ValveIndex;
use crate::time::{Timestamp, now};

/// Relay channel order of the reference 12-valve board.
///
/// Channels 6..=9 of the two chained registers are unused; the upper
/// register is wired in reverse.
pub const DEFAULT_CHANNELS: [u8; 12] = [0, 1, 2, 3, 4, 5, 15, 14, 13, 12, 11, 10];

/// Open/closed state of a single valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveState {
    Open,
    #[default]
    Closed,
}

impl ValveState {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl From<bool> for ValveState {
    fn from(open: bool) -> Self {
        if open { Self::Open } else { Self::Closed }
    }
}

/// Check that `index` addresses one of `count` valves.
///
/// # Errors
///
/// Returns [`ValidationError::ValveOutOfRange`] otherwise.
pub fn check_index(index: ValveIndex, count: usize) -> Result<(), ValveHubError> {
    if index < count {
        Ok(())
    } else {
        Err(ValidationError::ValveOutOfRange { index, count }.into())
    }
}

/// One valve in the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valve {
    pub index: ValveIndex,
    pub name: String,
    pub channel: u8,
    pub state: ValveState,
    pub last_changed: Timestamp,
}

/// Desired level of one relay channel, as handed to a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub channel: u8,
    pub energized: bool,
}

/// A valve whose state flipped as the result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveChange {
    pub valve: ValveIndex,
    pub from: ValveState,
    pub to: ValveState,
}

/// Ordered set of valves with the exactly-one-open invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValveBank {
    valves: Vec<Valve>,
}

impl ValveBank {
    /// Create a builder for constructing a [`ValveBank`].
    #[must_use]
    pub fn builder() -> ValveBankBuilder {
        ValveBankBuilder::default()
    }

    /// Number of valves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.valves.len()
    }

    /// Always `false` for a validated bank; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.valves.is_empty()
    }

    #[must_use]
    pub fn valves(&self) -> &[Valve] {
        &self.valves
    }

    #[must_use]
    pub fn get(&self, index: ValveIndex) -> Option<&Valve> {
        self.valves.get(index)
    }

    /// Open/closed flags in index order.
    #[must_use]
    pub fn states(&self) -> Vec<bool> {
        self.valves.iter().map(|v| v.state.is_open()).collect()
    }

    /// Index of the currently open valve.
    #[must_use]
    pub fn open_valve(&self) -> ValveIndex {
        self.valves
            .iter()
            .position(|v| v.state.is_open())
            .unwrap_or_default()
    }

    /// Relay image for the current state.
    #[must_use]
    pub fn channel_states(&self) -> Vec<ChannelState> {
        self.valves
            .iter()
            .map(|v| ChannelState {
                channel: v.channel,
                energized: v.state.is_open(),
            })
            .collect()
    }

    /// Check that `index` addresses a valve.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ValveOutOfRange`] otherwise.
    pub fn check_index(&self, index: ValveIndex) -> Result<(), ValveHubError> {
        check_index(index, self.valves.len())
    }

    /// Open `index` and close every other valve.
    ///
    /// Only valves whose state actually flipped are returned, closings
    /// before the opening. Selecting the valve that is already open is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ValveOutOfRange`] when `index` is unknown.
    pub fn select(
        &mut self,
        index: ValveIndex,
        at: Timestamp,
    ) -> Result<Vec<ValveChange>, ValveHubError> {
        self.check_index(index)?;

        let mut changes = Vec::new();
        for valve in self.valves.iter_mut().filter(|v| v.index != index) {
            if valve.state.is_open() {
                changes.push(ValveChange {
                    valve: valve.index,
                    from: ValveState::Open,
                    to: ValveState::Closed,
                });
                valve.state = ValveState::Closed;
                valve.last_changed = at;
            }
        }

        let target = &mut self.valves[index];
        if !target.state.is_open() {
            changes.push(ValveChange {
                valve: index,
                from: ValveState::Closed,
                to: ValveState::Open,
            });
            target.state = ValveState::Open;
            target.last_changed = at;
        }

        Ok(changes)
    }
}

/// Step-by-step builder for [`ValveBank`].
#[derive(Debug, Default)]
pub struct ValveBankBuilder {
    channels: Option<Vec<u8>>,
    names: Vec<String>,
    initial_open: ValveIndex,
}

impl ValveBankBuilder {
    /// Relay channel for each valve, in valve order.
    #[must_use]
    pub fn channels(mut self, channels: impl Into<Vec<u8>>) -> Self {
        self.channels = Some(channels.into());
        self
    }

    /// Display names; missing entries fall back to `Valve N` (1-based).
    #[must_use]
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn initial_open(mut self, index: ValveIndex) -> Self {
        self.initial_open = index;
        self
    }

    /// Consume the builder, validate, and return a [`ValveBank`].
    ///
    /// Defaults to [`DEFAULT_CHANNELS`] with valve 0 open.
    ///
    /// # Errors
    ///
    /// Returns [`ValveHubError::Validation`] when there are no channels,
    /// a channel is used twice, or `initial_open` is out of range.
    pub fn build(self) -> Result<ValveBank, ValveHubError> {
        let channels = self.channels.unwrap_or_else(|| DEFAULT_CHANNELS.to_vec());
        if channels.is_empty() {
            return Err(ValidationError::NoValves.into());
        }

        let mut seen = HashSet::with_capacity(channels.len());
        for channel in &channels {
            if !seen.insert(*channel) {
                return Err(ValidationError::DuplicateChannel(*channel).into());
            }
        }

        if self.initial_open >= channels.len() {
            return Err(ValidationError::ValveOutOfRange {
                index: self.initial_open,
                count: channels.len(),
            }
            .into());
        }

        let ts = now();
        let valves = channels
            .into_iter()
            .enumerate()
            .map(|(index, channel)| Valve {
                index,
                name: self
                    .names
                    .get(index)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Valve {}", index + 1)),
                channel,
                state: ValveState::from(index == self.initial_open),
                last_changed: ts,
            })
            .collect();

        Ok(ValveBank { valves })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ValveBank {
        ValveBank::builder().build().unwrap()
    }

    fn open_count(bank: &ValveBank) -> usize {
        bank.states().into_iter().filter(|open| *open).count()
    }

    #[test]
    fn should_default_to_reference_board_with_first_valve_open() {
        let bank = bank();
        assert_eq!(bank.len(), 12);
        assert_eq!(bank.open_valve(), 0);
        assert_eq!(bank.get(6).unwrap().channel, 15);
        assert_eq!(bank.get(0).unwrap().name, "Valve 1");
        assert_eq!(open_count(&bank), 1);
    }

    #[test]
    fn should_reject_empty_channel_list() {
        let result = ValveBank::builder().channels(Vec::new()).build();
        assert!(matches!(
            result,
            Err(ValveHubError::Validation(ValidationError::NoValves))
        ));
    }

    #[test]
    fn should_reject_duplicate_channel() {
        let result = ValveBank::builder().channels([0, 1, 1]).build();
        assert!(matches!(
            result,
            Err(ValveHubError::Validation(ValidationError::DuplicateChannel(1)))
        ));
    }

    #[test]
    fn should_reject_initial_open_out_of_range() {
        let result = ValveBank::builder()
            .channels([0, 1])
            .initial_open(2)
            .build();
        assert!(matches!(
            result,
            Err(ValveHubError::Validation(
                ValidationError::ValveOutOfRange { index: 2, count: 2 }
            ))
        ));
    }

    #[test]
    fn should_use_given_names_and_fall_back_for_missing_ones() {
        let bank = ValveBank::builder()
            .channels([0, 1, 2])
            .names(["Lawn", ""])
            .build()
            .unwrap();
        assert_eq!(bank.get(0).unwrap().name, "Lawn");
        assert_eq!(bank.get(1).unwrap().name, "Valve 2");
        assert_eq!(bank.get(2).unwrap().name, "Valve 3");
    }

    #[test]
    fn should_close_previous_and_open_selected_valve() {
        let mut bank = bank();
        let changes = bank.select(4, now()).unwrap();

        assert_eq!(
            changes,
            vec![
                ValveChange {
                    valve: 0,
                    from: ValveState::Open,
                    to: ValveState::Closed,
                },
                ValveChange {
                    valve: 4,
                    from: ValveState::Closed,
                    to: ValveState::Open,
                },
            ]
        );
        assert_eq!(bank.open_valve(), 4);
        assert_eq!(open_count(&bank), 1);
    }

    #[test]
    fn should_report_no_changes_when_selecting_open_valve() {
        let mut bank = bank();
        let before = bank.get(0).unwrap().last_changed;
        let changes = bank.select(0, now()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(bank.get(0).unwrap().last_changed, before);
    }

    #[test]
    fn should_reject_selecting_unknown_valve_without_touching_state() {
        let mut bank = bank();
        let result = bank.select(12, now());
        assert!(matches!(
            result,
            Err(ValveHubError::Validation(
                ValidationError::ValveOutOfRange { index: 12, count: 12 }
            ))
        ));
        assert_eq!(bank.open_valve(), 0);
    }

    #[test]
    fn should_energize_only_the_open_valves_channel() {
        let mut bank = bank();
        bank.select(7, now()).unwrap();
        let energized: Vec<u8> = bank
            .channel_states()
            .into_iter()
            .filter(|c| c.energized)
            .map(|c| c.channel)
            .collect();
        assert_eq!(energized, vec![14]);
    }

    #[test]
    fn should_serialize_state_lowercase() {
        assert_eq!(
            serde_json::to_string(&ValveState::Open).unwrap(),
            "\"open\""
        );
        assert_eq!(ValveState::from(false), ValveState::Closed);
    }

    #[test]
    fn should_check_index_against_valve_count() {
        assert!(check_index(2, 3).is_ok());
        assert!(matches!(
            check_index(3, 3),
            Err(ValveHubError::Validation(ValidationError::ValveOutOfRange {
                index: 3,
                count: 3
            }))
        ));
    }
}
