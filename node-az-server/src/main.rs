use std::sync::Arc;
use std::time::Duration;

use constcat::concat;
use node_az_cache::MetadataCache;
use node_az_cache::NodeMetadata;
use node_az_cache::Refresher;
use node_az_ext::DurationExt as _;
use node_az_ext::TimeExt as _;
use node_az_kubeapi::KubeApi;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::signal::unix::SignalKind;
use tower::ServiceBuilder;
use tracing_subscriber::EnvFilter;

use axum::BoxError;
use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::{Json, Router, routing::get};

use config::Config;
use state::AppState;

mod config;
mod state;

const API_ROOT: &str = "/api";
const API_AZ: &str = concat!(API_ROOT, "/az");

/// Upper bound on producing a single response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        pod = %config.pod_name,
        node = %config.node_name,
        node_ip = config.node_ip.as_deref().unwrap_or("-"),
        "Starting node-az-server"
    );

    let kubeapi = KubeApi::new(config.rate_limit).await?;
    let cache = Arc::new(MetadataCache::new());
    let refresher = Refresher::new(kubeapi, Arc::clone(&cache), &config.node_name)
        .node_ip(config.node_ip.clone())
        .interval(config.refresh_interval)
        .timeout(config.api_timeout);

    // Warm up the cache before serving traffic
    let _ = refresher.refresh().await;
    let refresher = refresher.spawn();

    let port = config.port;
    let refresh_interval = config.refresh_interval;
    let state = AppState::new(config, cache)?;
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(refresh = ?refresh_interval, "Listening on http://{addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;

    refresher.abort();
    Ok(())
}

/// Any path without a route of its own serves the info page.
fn router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/", get(info))
        .route(API_AZ, get(az))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .fallback(info)
        .with_state(state);
    with_timeout(routes, REQUEST_TIMEOUT)
}

fn with_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(request_failed))
            .timeout(timeout),
    )
}

async fn request_failed(err: BoxError) -> http::StatusCode {
    if err.is::<tower::timeout::error::Elapsed>() {
        http::StatusCode::REQUEST_TIMEOUT
    } else {
        tracing::error!(%err, "Request failed");
        http::StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn info(State(state): State<Arc<AppState>>) -> Response {
    let server_time = OffsetDateTime::now_utc().rfc3339_millis();
    let metadata = state.cache.snapshot().await;

    let response = match state.render_info(&metadata, &server_time) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            tracing::error!(%err, "Failed to render info page");
            http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    if state.config.access_log {
        tracing::info!(
            region = %metadata.region,
            zone = %metadata.zone,
            server_time,
            "Served /"
        );
    }
    response
}

/// JSON view of the cached metadata together with the pod identity.
#[derive(Debug, Serialize)]
struct AzInfo<'a> {
    az: &'a str,
    region: &'a str,
    node_name: &'a str,
    node_ip: &'a str,
    pod_name: &'a str,
    pod_ip: &'a str,
    updated_at: String,
    last_error: &'a str,
    source: &'static str,
    api_timeout: String,
}

async fn az(State(state): State<Arc<AppState>>) -> Response {
    let metadata = state.cache.snapshot().await;
    let config = &state.config;

    let response = Json(AzInfo {
        az: &metadata.zone,
        region: &metadata.region,
        node_name: &config.node_name,
        node_ip: &metadata.node_ip,
        pod_name: &config.pod_name,
        pod_ip: &config.pod_ip,
        updated_at: state::updated_at(&metadata),
        last_error: state::last_error(&metadata),
        source: "in-memory-cache",
        api_timeout: config.api_timeout.go_string(),
    })
    .into_response();

    if config.access_log {
        tracing::info!(zone = %metadata.zone, region = %metadata.region, "Served {API_AZ}");
    }
    response
}

async fn healthz() -> &'static str {
    "ok\n"
}

async fn readyz(State(state): State<Arc<AppState>>) -> (http::StatusCode, &'static str) {
    if state.cache.is_ready().await {
        (http::StatusCode::OK, "ready\n")
    } else {
        (http::StatusCode::SERVICE_UNAVAILABLE, "zone not ready\n")
    }
}

async fn shutdown() {
    let terminate = async {
        match tokio::signal::unix::signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        () = terminate => {},
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests;
