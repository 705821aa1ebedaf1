//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Derived grid metrics calculation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
pub mod aggregator;
pub mod capacity;
pub mod emissions;
pub mod errors;

pub use aggregator::{AggregationPolicy, MetricsAggregator};
pub use capacity::{estimate_capacity, CapacityEstimate};
pub use emissions::{carbon_intensity, reduction_percent, renewable_percentage};
pub use errors::{AggregationError, Result};
