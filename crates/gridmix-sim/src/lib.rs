//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Synthetic grid model exports."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Synthetic grid data used whenever live feeds cannot produce a snapshot, and
//! for the long-horizon decarbonisation trend view.

pub mod generator;
pub mod series;
pub mod window;

pub use generator::SyntheticModel;
pub use series::{TimeSeries, TrendPoint, TrendSummary};
pub use window::{TrendRequest, WindowKind};
