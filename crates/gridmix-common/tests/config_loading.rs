//! ---
//! ems_section: "02-configuration"
//! ems_subsection: "test"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Candidate resolution and the shipped sample configuration."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::time::Duration;

use gridmix_common::{AppConfig, LogFormat};

const SHIPPED: &str = include_str!("../../../configs/gridmix.toml");

#[test]
fn shipped_configuration_is_valid() {
    let config: AppConfig = SHIPPED.parse().unwrap();
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.sources.retry_attempts, 2);
    assert_eq!(config.sources.timeout, Duration::from_secs(10));
    assert_eq!(config.refresh.live_interval, Duration::from_secs(300));
    assert_eq!(config.api.listen.port(), 8080);
    assert!(config.synthetic.random_seed.is_none());
}

#[test]
fn first_existing_candidate_wins() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("gridmix.toml");
    fs::write(&present, "[refresh]\nlive_interval = 60\n").unwrap();

    let loaded = AppConfig::load_with_source(&[missing, present.clone()]).unwrap();
    assert_eq!(loaded.source, present);
    assert_eq!(loaded.config.refresh.live_interval, Duration::from_secs(60));
}

#[test]
fn no_candidates_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::load_with_source(&[dir.path().join("nope.toml")]).unwrap_err();
    assert!(err.to_string().contains("no configuration files found"));
}

#[test]
fn invalid_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[refresh]\nsynthetic_interval = 0\n").unwrap();

    let err = AppConfig::load_with_source(&[path.clone()]).unwrap_err();
    assert!(err.to_string().contains("broken.toml"));
}
