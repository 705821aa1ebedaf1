//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Primary orchestration and lifecycle management."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Fallback orchestration and adaptive refresh for GridMix.
//!
//! [`FallbackOrchestrator`] turns one round of feed fetches into a snapshot,
//! always producing something publishable. [`RefreshScheduler`] drives it on
//! a mode-dependent cadence and publishes [`GridState`] over a watch channel.

pub mod orchestrator;
pub mod scheduler;
pub mod state;

pub use orchestrator::{
    BranchReport, BranchStatus, CycleOutcome, FallbackOrchestrator, OrchestratorSettings,
};
pub use scheduler::{
    RefreshScheduler, SchedulerCommand, SchedulerController, SchedulerError, SchedulerHandle,
};
pub use state::GridState;
