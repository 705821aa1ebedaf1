//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Upstream grid feed clients."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use gridmix_common::{duration_to_millis, SourceKind};
use thiserror::Error;

/// Typed failure of a single feed fetch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("{feed} feed unreachable: {detail}")]
    Network { feed: SourceKind, detail: String },
    #[error("{feed} feed returned HTTP {status}")]
    BadStatus { feed: SourceKind, status: u16 },
    #[error("{feed} feed malformed at line {line}: {detail}")]
    Parse {
        feed: SourceKind,
        line: u64,
        detail: String,
    },
}

impl FetchError {
    pub fn network(feed: SourceKind, detail: impl Into<String>) -> Self {
        FetchError::Network {
            feed,
            detail: detail.into(),
        }
    }

    /// Network failure caused by the request exceeding its deadline.
    pub fn timeout(feed: SourceKind, after: Duration) -> Self {
        FetchError::Network {
            feed,
            detail: format!("timed out after {}ms", duration_to_millis(after)),
        }
    }

    pub fn parse(feed: SourceKind, line: u64, detail: impl Into<String>) -> Self {
        FetchError::Parse {
            feed,
            line,
            detail: detail.into(),
        }
    }

    pub fn feed(&self) -> SourceKind {
        match self {
            FetchError::Network { feed, .. }
            | FetchError::BadStatus { feed, .. }
            | FetchError::Parse { feed, .. } => *feed,
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network { .. } => FetchErrorKind::Network,
            FetchError::BadStatus { .. } => FetchErrorKind::BadStatus,
            FetchError::Parse { .. } => FetchErrorKind::Parse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Network,
    BadStatus,
    Parse,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::BadStatus => "bad_status",
            FetchErrorKind::Parse => "parse",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
