//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Runtime helpers supporting the refresh scheduler."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Timing helpers for the GridMix runtime.

pub mod scheduling;

pub use scheduling::{RetryPolicy, Sleep, Timer, TokioTimer};
