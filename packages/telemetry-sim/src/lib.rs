//! # telemetry-sim
//!
//! Synthetic drive generator for the onroad UI. Produces the same message
//! snapshots the real bus would, on independent per-topic schedules, with
//! injectable scenarios. Used by the `onroad-ui --demo` mode and by the
//! integration tests; it hands messages back to the caller and owns no
//! transport.

pub mod drive_sim;
pub mod scenarios;

pub use drive_sim::DriveSim;
pub use scenarios::{ScenarioConfig, ScenarioType};
