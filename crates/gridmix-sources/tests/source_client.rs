//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "test"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Feed client behaviour against a scripted transport."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridmix_common::{RawRecord, SourceKind};
use gridmix_sources::{
    FeedEndpoints, FeedResponse, FeedTransport, FetchError, FetchErrorKind, GridFeeds,
    SourceClient, TransportError,
};

const DEMAND_URL: &str = "http://feeds.test/demand.csv";
const GENERATION_URL: &str = "http://feeds.test/generation.csv";
const WEATHER_URL: &str = "http://feeds.test/weather.json";

#[derive(Default)]
struct ScriptedTransport {
    responses: HashMap<String, Result<FeedResponse, TransportError>>,
}

impl ScriptedTransport {
    fn respond(mut self, url: &str, response: Result<FeedResponse, TransportError>) -> Self {
        self.responses.insert(url.to_owned(), response);
        self
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<FeedResponse, TransportError> {
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::new("connection refused")))
    }
}

fn client(transport: ScriptedTransport) -> SourceClient {
    SourceClient::new(
        Arc::new(transport),
        FeedEndpoints {
            demand: DEMAND_URL.into(),
            generation: GENERATION_URL.into(),
            weather: WEATHER_URL.into(),
        },
        Duration::from_secs(10),
    )
}

#[tokio::test]
async fn fetches_and_parses_every_feed() {
    let transport = ScriptedTransport::default()
        .respond(
            DEMAND_URL,
            Ok(FeedResponse::ok(
                "timestamp,demand,forecast\n2024-06-01T12:00:00Z,15000,14500\n",
            )),
        )
        .respond(
            GENERATION_URL,
            Ok(FeedResponse::ok(
                "timestamp,nuclear,hydro,gas,wind,solar,biomass,coal\n2024-06-01T12:00:00Z,8500,4000,2000,2500,1500,400,0\n",
            )),
        )
        .respond(
            WEATHER_URL,
            Ok(FeedResponse::ok(
                r#"{"features":[{"properties":{"temperature":24.0,"wind_speed":18.0,"solar_radiation":650.0,"humidity":55.0}}]}"#,
            )),
        );
    let client = client(transport);

    let demand = client.demand().await.unwrap();
    assert_eq!(demand[0].demand, 15_000.0);
    let generation = client.generation().await.unwrap();
    assert_eq!(generation[0].mix.total(), 18_900.0);
    let weather = client.weather().await.unwrap().unwrap();
    assert_eq!(weather.wind_speed, 18.0);

    let raw = client.fetch(SourceKind::Weather).await.unwrap();
    assert_eq!(raw.len(), 1);
    assert!(matches!(raw[0], RawRecord::Weather(_)));
}

#[tokio::test]
async fn non_success_status_is_bad_status() {
    let transport = ScriptedTransport::default().respond(
        DEMAND_URL,
        Ok(FeedResponse {
            status: 503,
            body: "maintenance".into(),
        }),
    );
    let err = client(transport).fetch_demand().await.unwrap_err();
    assert_eq!(
        err,
        FetchError::BadStatus {
            feed: SourceKind::Demand,
            status: 503
        }
    );
}

#[tokio::test]
async fn transport_failures_map_to_network_kind() {
    let transport = ScriptedTransport::default()
        .respond(GENERATION_URL, Err(TransportError::timed_out("deadline elapsed")));
    let client = client(transport);

    let timeout = client.fetch_generation().await.unwrap_err();
    assert_eq!(timeout.kind(), FetchErrorKind::Network);
    assert!(timeout.to_string().contains("timed out"));

    let refused = client.fetch_weather().await.unwrap_err();
    assert_eq!(refused.kind(), FetchErrorKind::Network);
    assert_eq!(refused.feed(), SourceKind::Weather);
}

#[tokio::test]
async fn empty_weather_feed_is_success_without_records() {
    let transport =
        ScriptedTransport::default().respond(WEATHER_URL, Ok(FeedResponse::ok(r#"{"features":[]}"#)));
    let client = client(transport);
    assert_eq!(client.fetch_weather().await.unwrap(), None);
    assert!(client.fetch(SourceKind::Weather).await.unwrap().is_empty());
}
