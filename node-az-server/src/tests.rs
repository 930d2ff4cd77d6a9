use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use http_body_util::BodyExt as _;
use serde_json::Value;
use tower::ServiceExt as _;

use super::*;

fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
    vars.iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn config(vars: &[(&str, &str)]) -> Result<Config, config::ConfigError> {
    let env = env(vars);
    Config::from_lookup(|key| env.get(key).cloned())
}

fn test_config() -> Config {
    config(&[
        ("NODE_NAME", "worker-1"),
        ("POD_NAME", "node-az-7f9c"),
        ("POD_NAMESPACE", "demo"),
        ("POD_IP", "10.128.0.12"),
    ])
    .unwrap()
}

fn app() -> (Router, Arc<MetadataCache>) {
    app_with(test_config())
}

fn app_with(config: Config) -> (Router, Arc<MetadataCache>) {
    let cache = Arc::new(MetadataCache::new());
    let state = AppState::new(config, Arc::clone(&cache)).unwrap();
    (router(Arc::new(state)), cache)
}

fn resolved() -> NodeMetadata {
    let at = OffsetDateTime::from_unix_timestamp(1_714_557_600).unwrap();
    NodeMetadata::resolved("eu-west-1a", "eu-west-1", "10.0.0.5", at)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[test]
fn config_defaults() {
    let config = config(&[("NODE_NAME", "worker-1")]).unwrap();
    assert_eq!(config.node_name, "worker-1");
    assert_eq!(config.node_ip, None);
    assert_eq!(config.pod_name, "");
    assert_eq!(config.refresh_interval, Duration::from_secs(60));
    assert_eq!(config.api_timeout, Duration::from_secs(2));
    assert!(!config.access_log);
    assert_eq!(config.rate_limit.qps, 20.0);
    assert_eq!(config.rate_limit.burst, 40);
    assert_eq!(config.port, 8080);
}

#[test]
fn missing_node_name_is_fatal() {
    let err = config(&[("POD_NAME", "node-az-7f9c")]).unwrap_err();
    assert!(matches!(err, config::ConfigError::MissingNodeName));

    let err = config(&[("NODE_NAME", "")]).unwrap_err();
    assert_eq!(err.to_string(), "NODE_NAME environment variable not set");
}

#[test]
fn config_go_durations() {
    let config = config(&[
        ("NODE_NAME", "worker-1"),
        ("AZ_REFRESH_INTERVAL", "1m30s"),
        ("KUBE_API_TIMEOUT", "500ms"),
    ])
    .unwrap();
    assert_eq!(config.refresh_interval, Duration::from_secs(90));
    assert_eq!(config.api_timeout, Duration::from_millis(500));
}

#[test]
fn config_invalid_values_fall_back() {
    let config = config(&[
        ("NODE_NAME", "worker-1"),
        ("AZ_REFRESH_INTERVAL", "soon"),
        ("KUBE_API_TIMEOUT", "-2s"),
        ("ACCESS_LOG", "maybe"),
        ("KUBE_CLIENT_QPS", "fast"),
        ("KUBE_CLIENT_BURST", "0"),
        ("LISTEN_PORT", "http"),
    ])
    .unwrap();
    assert_eq!(config.refresh_interval, Duration::from_secs(60));
    assert_eq!(config.api_timeout, Duration::from_secs(2));
    assert!(!config.access_log);
    assert_eq!(config.rate_limit.qps, 20.0);
    assert_eq!(config.rate_limit.burst, 40);
    assert_eq!(config.port, 8080);
}

#[test]
fn config_access_log_flag() {
    for value in ["1", "true", "TRUE", "yes", "YES", "on", "ON"] {
        let config = config(&[("NODE_NAME", "worker-1"), ("ACCESS_LOG", value)]).unwrap();
        assert!(config.access_log, "{value}");
    }
    for value in ["0", "false", "FALSE", "no", "NO", "off", "OFF", "True"] {
        let config = config(&[("NODE_NAME", "worker-1"), ("ACCESS_LOG", value)]).unwrap();
        assert!(!config.access_log, "{value}");
    }
}

#[test]
fn config_identity_and_tuning() {
    let config = config(&[
        ("NODE_NAME", "worker-1"),
        ("NODE_IP", "192.168.1.1"),
        ("POD_IP", "10.128.0.12"),
        ("KUBE_CLIENT_QPS", "5.5"),
        ("KUBE_CLIENT_BURST", "10"),
        ("LISTEN_PORT", "9090"),
    ])
    .unwrap();
    assert_eq!(config.node_ip.as_deref(), Some("192.168.1.1"));
    assert_eq!(config.pod_ip, "10.128.0.12");
    assert_eq!(config.rate_limit.qps, 5.5);
    assert_eq!(config.rate_limit.burst, 10);
    assert_eq!(config.port, 9090);
}

#[tokio::test]
async fn healthz_ignores_cache_state() {
    let (app, _cache) = app();
    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok\n");
}

#[tokio::test]
async fn readyz_follows_first_successful_refresh() {
    let (app, cache) = app();
    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "zone not ready\n");

    cache.set(resolved()).await;
    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready\n");

    cache.record_failure("connection refused").await;
    let (status, _) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn az_before_first_refresh() {
    let (app, _cache) = app();
    let (status, json) = get_json(&app, "/api/az").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["az"], "ZONE UNKNOWN");
    assert_eq!(json["region"], "REGION UNKNOWN");
    assert_eq!(json["node_ip"], "0.0.0.0");
    assert_eq!(json["updated_at"], "-");
    assert_eq!(json["last_error"], "not initialized");
}

#[tokio::test]
async fn az_reports_cached_metadata() {
    let (app, cache) = app();
    cache.set(resolved()).await;

    let (status, json) = get_json(&app, "/api/az").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["az"], "eu-west-1a");
    assert_eq!(json["region"], "eu-west-1");
    assert_eq!(json["node_name"], "worker-1");
    assert_eq!(json["node_ip"], "10.0.0.5");
    assert_eq!(json["pod_name"], "node-az-7f9c");
    assert_eq!(json["pod_ip"], "10.128.0.12");
    assert_eq!(json["updated_at"], "2024-05-01T10:00:00Z");
    assert_eq!(json["last_error"], "-");
    assert_eq!(json["source"], "in-memory-cache");
    assert_eq!(json["api_timeout"], "2s");
}

#[tokio::test]
async fn az_reports_api_timeout_in_go_notation() {
    for (timeout, expected) in [("1m30s", "1m30s"), ("1h", "1h0m0s"), ("500ms", "500ms")] {
        let vars = config(&[("NODE_NAME", "worker-1"), ("KUBE_API_TIMEOUT", timeout)]).unwrap();
        let (app, _cache) = app_with(vars);
        let (_, json) = get_json(&app, "/api/az").await;
        assert_eq!(json["api_timeout"], expected, "{timeout}");
    }
}

#[tokio::test]
async fn az_reports_stale_values_with_error() {
    let (app, cache) = app();
    cache.set(resolved()).await;
    cache.record_failure(r#"nodes "worker-1" not found"#).await;

    let (status, json) = get_json(&app, "/api/az").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["az"], "eu-west-1a");
    assert_eq!(json["updated_at"], "2024-05-01T10:00:00Z");
    assert_eq!(json["last_error"], r#"nodes "worker-1" not found"#);
}

#[tokio::test]
async fn info_page_renders_sentinels() {
    let (app, _cache) = app();
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ZONE UNKNOWN"));
    assert!(body.contains("REGION UNKNOWN"));
    assert!(body.contains("not initialized"));
    assert!(body.contains("worker-1"));
    assert!(body.contains("demo"));
}

#[tokio::test]
async fn info_page_renders_cached_metadata() {
    let (app, cache) = app();
    cache.set(resolved()).await;
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<span class="zone">eu-west-1a</span>"#));
    assert!(body.contains(r#"<span class="region">eu-west-1</span>"#));
    assert!(body.contains("2024-05-01T10:00:00Z"));
}

#[tokio::test]
async fn info_page_escapes_values() {
    let mut config = test_config();
    config.pod_name = "<script>alert(1)</script>".to_string();
    config.access_log = true;
    let (app, _cache) = app_with(config);
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<script>alert(1)</script>"));
    assert!(body.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn unknown_paths_serve_info_page() {
    let (app, cache) = app();
    cache.set(resolved()).await;
    for uri in ["/foo", "/api", "/zone/info.html"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.contains(r#"<span class="zone">eu-west-1a</span>"#), "{uri}");
    }
}

#[tokio::test(start_paused = true)]
async fn slow_responses_time_out() {
    let slow = Router::new().route(
        "/slow",
        axum::routing::get(|| std::future::pending::<&'static str>()),
    );
    let app = with_timeout(slow, Duration::from_secs(5));
    let (status, _) = get(&app, "/slow").await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

#[test]
fn dash_for_missing_values() {
    let metadata = NodeMetadata::unknown();
    assert_eq!(state::updated_at(&metadata), "-");
    assert_eq!(state::last_error(&resolved()), "-");
    assert_eq!(state::last_error(&metadata), "not initialized");
}
