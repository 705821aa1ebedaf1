//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Upstream grid feed clients."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridmix_common::{
    DemandRecord, GenerationRecord, RawRecord, SourceKind, SourcesConfig, WeatherRecord,
};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::parse::{parse_demand_csv, parse_generation_csv, parse_weather_json};
use crate::transport::{FeedTransport, ReqwestTransport};

/// URLs of the three upstream feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    pub demand: String,
    pub generation: String,
    pub weather: String,
}

impl FeedEndpoints {
    pub fn url(&self, source: SourceKind) -> &str {
        match source {
            SourceKind::Demand => &self.demand,
            SourceKind::Generation => &self.generation,
            SourceKind::Weather => &self.weather,
        }
    }
}

impl From<&SourcesConfig> for FeedEndpoints {
    fn from(config: &SourcesConfig) -> Self {
        Self {
            demand: config.demand_url.clone(),
            generation: config.generation_url.clone(),
            weather: config.weather_url.clone(),
        }
    }
}

/// Typed access to the three feeds, as consumed by the orchestrator.
#[async_trait]
pub trait GridFeeds: Send + Sync {
    async fn demand(&self) -> Result<Vec<DemandRecord>, FetchError>;

    async fn generation(&self) -> Result<Vec<GenerationRecord>, FetchError>;

    /// `Ok(None)` when the feed answered but carried no observation.
    async fn weather(&self) -> Result<Option<WeatherRecord>, FetchError>;
}

/// Fetches one feed per call and parses it into typed records.
#[derive(Clone)]
pub struct SourceClient {
    transport: Arc<dyn FeedTransport>,
    endpoints: FeedEndpoints,
    timeout: Duration,
}

impl std::fmt::Debug for SourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceClient")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SourceClient {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        endpoints: FeedEndpoints,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            endpoints,
            timeout,
        }
    }

    /// Client using the reqwest transport and the configured endpoints.
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self::new(
            Arc::new(ReqwestTransport::new(&config.user_agent)),
            FeedEndpoints::from(config),
            config.timeout,
        )
    }

    /// Fetch any feed and return its records in the shared representation.
    pub async fn fetch(&self, source: SourceKind) -> Result<Vec<RawRecord>, FetchError> {
        let records = match source {
            SourceKind::Demand => self
                .fetch_demand()
                .await?
                .into_iter()
                .map(RawRecord::Demand)
                .collect(),
            SourceKind::Generation => self
                .fetch_generation()
                .await?
                .into_iter()
                .map(RawRecord::Generation)
                .collect(),
            SourceKind::Weather => self
                .fetch_weather()
                .await?
                .into_iter()
                .map(RawRecord::Weather)
                .collect(),
        };
        Ok(records)
    }

    pub async fn fetch_demand(&self) -> Result<Vec<DemandRecord>, FetchError> {
        let body = self.get_body(SourceKind::Demand).await?;
        parse_demand_csv(&body)
    }

    pub async fn fetch_generation(&self) -> Result<Vec<GenerationRecord>, FetchError> {
        let body = self.get_body(SourceKind::Generation).await?;
        parse_generation_csv(&body)
    }

    pub async fn fetch_weather(&self) -> Result<Option<WeatherRecord>, FetchError> {
        let body = self.get_body(SourceKind::Weather).await?;
        parse_weather_json(&body)
    }

    async fn get_body(&self, source: SourceKind) -> Result<String, FetchError> {
        let url = self.endpoints.url(source);
        debug!(source = %source, url, "fetching feed");
        let response = self.transport.get(url, self.timeout).await.map_err(|err| {
            warn!(source = %source, error = %err, "feed transport failure");
            if err.timed_out {
                FetchError::timeout(source, self.timeout)
            } else {
                FetchError::network(source, err.message)
            }
        })?;
        if !response.is_success() {
            warn!(source = %source, status = response.status, "feed returned error status");
            return Err(FetchError::BadStatus {
                feed: source,
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

#[async_trait]
impl GridFeeds for SourceClient {
    async fn demand(&self) -> Result<Vec<DemandRecord>, FetchError> {
        self.fetch_demand().await
    }

    async fn generation(&self) -> Result<Vec<GenerationRecord>, FetchError> {
        self.fetch_generation().await
    }

    async fn weather(&self) -> Result<Option<WeatherRecord>, FetchError> {
        self.fetch_weather().await
    }
}
