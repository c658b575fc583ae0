//! BDD step definitions for dashboard builder and lifecycle

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use agro_dashboard::config::{Config, DashboardConfig, DemoConfig};
use agro_dashboard::io::HttpClient;
use agro_dashboard::transport::RealtimeConnector;
use agro_dashboard::{DashboardBuilder, DashboardError};

use crate::doubles::RecordingHttpClient;
use crate::world::AgroWorld;

const WAIT: Duration = Duration::from_secs(3);

fn builder(world: &mut AgroWorld) -> DashboardBuilder {
    let config = world.config.clone().expect("no dashboard config");
    let http = world
        .http
        .get_or_insert_with(|| Arc::new(RecordingHttpClient::answering(200)))
        .clone();

    let mut builder = DashboardBuilder::new(config).with_http_client(http as Arc<dyn HttpClient>);
    if let Some(backend) = &world.backend {
        builder = builder.with_connector(Arc::clone(&backend.connector) as Arc<dyn RealtimeConnector>);
    }
    let cancel = world.cancel.get_or_insert_with(CancellationToken::new).clone();
    builder.with_cancellation_token(cancel)
}

async fn get(world: &AgroWorld, path: &str) -> reqwest::Response {
    let base = world.base_address.as_ref().expect("dashboard not started");
    reqwest::get(format!("{}{}", base, path))
        .await
        .unwrap_or_else(|e| panic!("GET {} failed: {}", path, e))
}

/// Poll `path` until `check` accepts the JSON body
async fn eventually(world: &AgroWorld, path: &str, check: impl Fn(&serde_json::Value) -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let body: serde_json::Value = get(world, path).await.json().await.unwrap();
        if check(&body) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} never matched, last body: {}",
            path,
            body
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// --- Given steps ---

#[given("a dashboard config on an ephemeral port")]
fn config_on_ephemeral_port(world: &mut AgroWorld) {
    world.config = Some(Config {
        api_url: "http://farm.local:5000".to_string(),
        demo: DemoConfig {
            interval_ms: 100,
            ..DemoConfig::default()
        },
        dashboard: DashboardConfig { port: 0 },
        ..Config::default()
    });
}

#[given(expr = "a dashboard config with backend address {string}")]
fn config_with_backend(world: &mut AgroWorld, address: String) {
    config_on_ephemeral_port(world);
    if let Some(config) = world.config.as_mut() {
        config.override_api_url(Some(address));
    }
}

#[given("the live subscription is disabled")]
fn subscription_disabled(world: &mut AgroWorld) {
    world
        .config
        .as_mut()
        .expect("no dashboard config")
        .subscriber
        .enabled = false;
}

#[given("a pre-cancelled cancellation token")]
fn pre_cancelled_token(world: &mut AgroWorld) {
    let token = CancellationToken::new();
    token.cancel();
    world.cancel = Some(token);
}

// --- When steps ---

#[when("the dashboard is built")]
async fn dashboard_is_built(world: &mut AgroWorld) {
    match builder(world).build().await {
        Ok(_) => world.build_error = None,
        Err(e) => world.build_error = Some(e),
    }
}

#[when("the dashboard is built and started")]
async fn dashboard_built_and_started(world: &mut AgroWorld) {
    let succeeded = match builder(world).build().await {
        Ok(dashboard) => dashboard.start().await.is_ok(),
        Err(_) => false,
    };
    world.lifecycle_succeeded = Some(succeeded);
}

#[when("the dashboard is started")]
async fn dashboard_is_started(world: &mut AgroWorld) {
    let dashboard = builder(world).build().await.expect("build failed");
    let port = dashboard.local_addr().expect("no local address").port();
    world.base_address = Some(format!("http://127.0.0.1:{}", port));
    world.running = Some(tokio::spawn(dashboard.start()));
}

#[when("the dashboard is cancelled")]
fn dashboard_is_cancelled(world: &mut AgroWorld) {
    world.cancel.as_ref().expect("no cancellation token").cancel();
}

// --- Then steps ---

#[then(expr = "GET {string} should return {string}")]
async fn get_should_return(world: &mut AgroWorld, path: String, expected: String) {
    let response = get(world, &path).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), expected);
}

#[then(expr = "GET {string} should contain {string}")]
async fn get_should_contain(world: &mut AgroWorld, path: String, expected: String) {
    let text = get(world, &path).await.text().await.unwrap();
    assert!(text.contains(&expected), "{} does not contain {:?}", path, expected);
}

#[then(expr = "the dashboard API should eventually report soil moisture {int}")]
async fn api_reports_soil(world: &mut AgroWorld, raw: i64) {
    eventually(world, "/api/snapshot", |body| {
        body["humedadSuelo"].as_f64() == Some(raw as f64)
    })
    .await;
}

#[then("the demo history should eventually fill up")]
async fn demo_history_fills(world: &mut AgroWorld) {
    eventually(world, "/api/history", |body| {
        body.as_array().is_some_and(|points| points.len() >= 3)
    })
    .await;
}

#[then("the dashboard should stop cleanly")]
async fn dashboard_stops_cleanly(world: &mut AgroWorld) {
    let running = world.running.take().expect("dashboard not started");
    let result = tokio::time::timeout(WAIT, running)
        .await
        .expect("dashboard did not stop in time")
        .expect("dashboard task panicked");
    assert!(result.is_ok(), "dashboard failed: {:?}", result);
}

#[then("the build should fail with a configuration error")]
fn build_fails_with_config_error(world: &mut AgroWorld) {
    match &world.build_error {
        Some(DashboardError::Config(_)) => {}
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[then("the build should succeed")]
fn build_succeeds(world: &mut AgroWorld) {
    assert!(world.build_error.is_none(), "{:?}", world.build_error);
}

#[then("the lifecycle should complete successfully")]
fn lifecycle_completes(world: &mut AgroWorld) {
    assert_eq!(world.lifecycle_succeeded, Some(true));
}
