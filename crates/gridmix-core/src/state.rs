//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Primary orchestration and lifecycle management."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gridmix_common::{Mode, Snapshot};
use serde::Serialize;
use serde_with::{serde_as, DurationMilliSeconds};

/// Everything a presentation layer needs: the latest snapshot plus freshness and error state.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    pub snapshot: Arc<Snapshot>,
    /// Publish time of the latest completed cycle; `None` until the first one completes.
    pub last_updated: Option<DateTime<Utc>>,
    pub mode: Mode,
    /// Advisory from the most recent live attempt that fell back to synthetic data.
    pub error: Option<String>,
    pub is_refreshing: bool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub refresh_interval: Duration,
    /// Number of cycles published so far.
    pub cycles: u64,
}

impl GridState {
    /// State before the first cycle completes.
    pub fn initial(at: DateTime<Utc>, mode: Mode, refresh_interval: Duration) -> Self {
        Self {
            snapshot: Arc::new(Snapshot::empty(at)),
            last_updated: None,
            mode,
            error: None,
            is_refreshing: true,
            refresh_interval,
            cycles: 0,
        }
    }
}
