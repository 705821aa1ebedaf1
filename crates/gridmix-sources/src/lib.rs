//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Upstream grid feed clients."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Clients for the three upstream grid feeds.
//!
//! Each feed is fetched through an injectable [`FeedTransport`] and parsed into
//! the typed records of `gridmix_common::records`. Failures surface as
//! [`FetchError`]; this crate never retries and never falls back.

pub mod client;
pub mod error;
pub mod parse;
pub mod transport;

pub use client::{FeedEndpoints, GridFeeds, SourceClient};
pub use error::{FetchError, FetchErrorKind};
pub use transport::{FeedResponse, FeedTransport, ReqwestTransport, TransportError};
