//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the metrics engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

/// Upper bound on the time one feed may take per cycle, retries included.
pub const MAX_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_sources_enabled() -> bool {
    true
}

fn default_demand_url() -> String {
    "https://www.ieso.ca/-/media/files/ieso/uploaded/chart/price_forecast.csv".to_owned()
}

fn default_generation_url() -> String {
    "https://www.ieso.ca/-/media/files/ieso/uploaded/chart/generation_by_fuel_type.csv".to_owned()
}

fn default_weather_url() -> String {
    "https://api.weather.gc.ca/collections/observation/items?station=TORONTO&limit=1".to_owned()
}

fn default_source_timeout() -> Duration {
    MAX_SOURCE_TIMEOUT
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_user_agent() -> String {
    concat!("gridmix/", env!("CARGO_PKG_VERSION")).to_owned()
}

fn default_live_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_synthetic_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_history_points() -> usize {
    24
}

fn default_history_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_utc_offset_hours() -> i32 {
    -5
}

fn default_high_demand_mw() -> f64 {
    18_000.0
}

fn default_heat_alert_celsius() -> f64 {
    30.0
}

fn default_renewable_target() -> f64 {
    80.0
}

fn default_emissions_target() -> f64 {
    200.0
}

fn default_emissions_baseline() -> f64 {
    250.0
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Primary configuration object for the GridMix runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "GRIDMIX_CONFIG";

    /// Load configuration from the first existing candidate together with its path.
    /// A non-empty `GRIDMIX_CONFIG` takes precedence over every candidate.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.sources.validate()?;
        self.refresh.validate()?;
        self.synthetic.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Upstream feed endpoints and the fetch policy applied to them.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// When false the orchestrator never contacts the feeds and always serves synthetic data.
    #[serde(default = "default_sources_enabled")]
    pub enabled: bool,
    #[serde(default = "default_demand_url")]
    pub demand_url: String,
    #[serde(default = "default_generation_url")]
    pub generation_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    /// Per-cycle budget for each feed, covering retries and their delays.
    #[serde(default = "default_source_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub retry_delay: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_sources_enabled(),
            demand_url: default_demand_url(),
            generation_url: default_generation_url(),
            weather_url: default_weather_url(),
            timeout: default_source_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourcesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() || self.timeout > MAX_SOURCE_TIMEOUT {
            bail!(
                "sources.timeout must be between 1 and {} seconds",
                MAX_SOURCE_TIMEOUT.as_secs()
            );
        }
        if self.retry_attempts == 0 {
            bail!("sources.retry_attempts must be at least 1");
        }
        if !self.enabled {
            return Ok(());
        }
        for (name, value) in [
            ("demand_url", &self.demand_url),
            ("generation_url", &self.generation_url),
            ("weather_url", &self.weather_url),
        ] {
            Url::parse(value).with_context(|| format!("sources.{} is not a valid url", name))?;
        }
        Ok(())
    }
}

/// Refresh cadence per mode.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_live_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub live_interval: Duration,
    #[serde(default = "default_synthetic_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub synthetic_interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            live_interval: default_live_interval(),
            synthetic_interval: default_synthetic_interval(),
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<()> {
        if self.live_interval.is_zero() || self.synthetic_interval.is_zero() {
            bail!("refresh intervals must be non-zero");
        }
        Ok(())
    }
}

/// Parameters of the synthetic model used when live data is unavailable.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Fixed seed for reproducible output; entropy-seeded when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default = "default_history_points")]
    pub history_points: usize,
    #[serde(default = "default_history_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub history_interval: Duration,
    /// Offset of the monitored region from UTC, used for the diurnal solar profile.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            history_points: default_history_points(),
            history_interval: default_history_interval(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_points == 0 {
            bail!("synthetic.history_points must be at least 1");
        }
        if self.history_interval.is_zero() {
            bail!("synthetic.history_interval must be non-zero");
        }
        if !(-14..=14).contains(&self.utc_offset_hours) {
            bail!(
                "synthetic.utc_offset_hours {} is outside -14..=14",
                self.utc_offset_hours
            );
        }
        Ok(())
    }
}

/// Alert thresholds and policy targets applied while deriving metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_high_demand_mw")]
    pub high_demand_mw: f64,
    #[serde(default = "default_heat_alert_celsius")]
    pub heat_alert_celsius: f64,
    #[serde(default = "default_renewable_target")]
    pub renewable_target: f64,
    #[serde(default = "default_emissions_target")]
    pub emissions_target: f64,
    #[serde(default = "default_emissions_baseline")]
    pub emissions_baseline: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            high_demand_mw: default_high_demand_mw(),
            heat_alert_celsius: default_heat_alert_celsius(),
            renewable_target: default_renewable_target(),
            emissions_target: default_emissions_target(),
            emissions_baseline: default_emissions_baseline(),
        }
    }
}

impl ThresholdsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.renewable_target) {
            bail!("thresholds.renewable_target must be a percentage");
        }
        if self.emissions_baseline <= 0.0 {
            bail!("thresholds.emissions_baseline must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}
