//! Scheduling layer
//!
//! Builds sync cycles from configuration and runs them, once under the
//! instance lock or repeatedly in a poll loop.

pub mod coordinator;
pub mod cycle;

pub use coordinator::{Outcome, RunCoordinator};
pub use cycle::{ConfigCycleFactory, CycleSetup};
