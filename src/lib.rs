//! Cascade Studio: cascading failure simulation over an internet
//! infrastructure dependency graph.
//!
//! The core (`graph`, `propagation`, `metrics`, `insights`, `narrative`,
//! `site`) is synchronous and free of side effects. [`simulation::Simulation`]
//! layers session state on top, and [`playback`] paces it for display.

pub mod config;
pub mod error;
pub mod graph;
pub mod insights;
pub mod metrics;
pub mod narrative;
pub mod playback;
pub mod propagation;
pub mod scenario;
pub mod simulation;
pub mod site;

#[cfg(feature = "desktop")]
pub mod commands;

pub use config::StudioConfig;
pub use error::{CascadeError, ErrorCode};
pub use graph::{InfraEdge, InfraNode, InfraType, InternetGraph, NodeStatus, StatusMap};
pub use propagation::{propagate_failure, propagate_from_state, StatusChange, Wave};
pub use scenario::{Scenario, ScenarioId};
pub use simulation::{Simulation, SimulationSnapshot, WaveUpdate};
