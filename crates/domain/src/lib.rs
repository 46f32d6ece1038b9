//! # valvehub-domain
//!
//! Pure domain model for the valvehub valve controller.
//!
//! ## Responsibilities
//! - Foundational types: identifiers, error conventions, timestamps
//! - Define **Valves** and the **ValveBank** (exactly one valve open)
//! - Define **Commands** (`toggle`, `startAuto`, `stopAuto`) as sent by clients
//! - Define **ServerMessages** (`init`, `update`, …) as pushed to observers
//! - Define **Events** (valve changes, auto-control runs, observers)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod event;
pub mod message;
pub mod valve;
