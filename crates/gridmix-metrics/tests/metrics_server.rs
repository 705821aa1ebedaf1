//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "test"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Scrape endpoint smoke test."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::net::SocketAddr;

use gridmix_metrics::{new_registry, spawn_http_server, RefreshMetrics};

#[tokio::test]
async fn serves_refresh_metrics_over_http() {
    let registry = new_registry();
    let metrics = RefreshMetrics::new(registry.clone()).unwrap();
    metrics.record_cycle("synthetic", 0.01);

    let server = spawn_http_server(registry, SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
    let url = format!("http://{}/metrics", server.addr());
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let content_type = response.headers()[reqwest::header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .to_owned();
    assert!(content_type.starts_with("text/plain"));
    let body = response.text().await.unwrap();
    assert!(body.contains("gridmix_refresh_cycles_total{mode=\"synthetic\"} 1"));

    server.shutdown().await.unwrap();
}
