//! # persona-gateway
//!
//! HTTP capability gateway. Exposes the local host adapters to plugins
//! running on the gateway-fallback path:
//!
//! - `POST /api/filesystem` — `readFile` / `writeFile`
//! - `POST /api/systeminfo` — load averages and memory counters
//! - `GET /api/plugins` — installed plugins, rediscovered per request
//! - `GET /health`, `GET /metrics`

pub mod metrics;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use persona_config::schema::GatewayConfig;
use persona_core::wire::{
    FILESYSTEM_ROUTE, FilesystemRequest, FilesystemResponse, FsAction, HEALTH_ROUTE,
    PLUGINS_ROUTE, SYSTEMINFO_ROUTE, SystemInfoResponse,
};
use persona_core::{HostAdapterSet, PersonaError, PluginDescriptor, SystemStatus};
use persona_plugin::LocalAdapterSet;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared server state.
pub struct AppState {
    pub config: GatewayConfig,
    /// Root scanned by `GET /api/plugins`.
    pub plugin_dir: PathBuf,
    /// Adapters every capability request is dispatched to.
    pub adapters: Arc<dyn HostAdapterSet>,
    /// Prometheus-compatible metrics.
    pub metrics: metrics::Metrics,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

/// Plugin listing response.
#[derive(Serialize)]
struct PluginsResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<PluginDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Build the Axum router backed by the local host adapters.
pub fn build_router(config: GatewayConfig, plugin_dir: PathBuf) -> Router {
    build_router_with_adapters(config, plugin_dir, Arc::new(LocalAdapterSet::new()))
}

/// Build the Axum router with an explicit adapter set.
pub fn build_router_with_adapters(
    config: GatewayConfig,
    plugin_dir: PathBuf,
    adapters: Arc<dyn HostAdapterSet>,
) -> Router {
    let cors = config.cors;
    let state = Arc::new(AppState {
        config,
        plugin_dir,
        adapters,
        metrics: metrics::Metrics::new(),
    });

    let mut router = Router::new()
        .route(HEALTH_ROUTE, get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(FILESYSTEM_ROUTE, post(filesystem_handler))
        .route(SYSTEMINFO_ROUTE, post(systeminfo_handler))
        .route(PLUGINS_ROUTE, get(plugins_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// Run blocking adapter work off the async worker threads.
async fn blocking<T, F>(f: F) -> persona_core::Result<T>
where
    F: FnOnce() -> persona_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PersonaError::Other(anyhow::anyhow!("adapter task failed: {e}")))?
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    state.metrics.inc_http_requests();
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: state.metrics.uptime_secs(),
    })
}

/// Prometheus-compatible metrics endpoint.
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> (
    StatusCode,
    [(axum::http::header::HeaderName, &'static str); 1],
    String,
) {
    let body = state.metrics.render_prometheus();
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

async fn filesystem_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FilesystemRequest>,
) -> (StatusCode, Json<FilesystemResponse>) {
    state.metrics.inc_http_requests();

    // Unknown actions are rejected before any adapter runs
    let action = match req.action() {
        Ok(action) => action,
        Err(_) => {
            warn!(action = %req.action, "rejected filesystem request");
            state.metrics.inc_http_errors();
            return (
                StatusCode::BAD_REQUEST,
                Json(FilesystemResponse {
                    success: false,
                    data: None,
                    message: Some(format!("Invalid action: {}", req.action)),
                    error_kind: None,
                }),
            );
        }
    };

    let adapters = state.adapters.clone();
    let path = req.path.clone();
    let result = match action {
        FsAction::ReadFile => {
            state.metrics.inc_fs_reads();
            blocking(move || adapters.read_file(&path))
                .await
                .map(FilesystemResponse::data)
        }
        FsAction::WriteFile => {
            state.metrics.inc_fs_writes();
            let content = req.content.clone().unwrap_or_default();
            blocking(move || adapters.write_file(&path, &content))
                .await
                .map(|()| FilesystemResponse::message("File written successfully".into()))
        }
    };

    match result {
        Ok(resp) => {
            debug!(action = action.as_str(), path = %req.path, "filesystem request served");
            (StatusCode::OK, Json(resp))
        }
        Err(e) => {
            warn!(action = action.as_str(), path = %req.path, error = %e, "filesystem request failed");
            state.metrics.inc_http_errors();
            state.metrics.inc_adapter_failures();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FilesystemResponse::failure(&e)),
            )
        }
    }
}

async fn systeminfo_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SystemInfoResponse>) {
    state.metrics.inc_http_requests();
    state.metrics.inc_telemetry_samples();

    let adapters = state.adapters.clone();
    let sampled = blocking(move || {
        Ok(SystemStatus {
            cpu_load: adapters.get_cpu_load()?,
            free_memory: adapters.get_free_memory()?,
            total_memory: adapters.get_total_memory()?,
        })
    })
    .await;

    match sampled {
        Ok(status) => (
            StatusCode::OK,
            Json(SystemInfoResponse {
                success: true,
                data: Some(status),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "telemetry sample failed");
            state.metrics.inc_http_errors();
            state.metrics.inc_adapter_failures();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SystemInfoResponse {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

async fn plugins_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<PluginsResponse>) {
    state.metrics.inc_http_requests();

    let root = state.plugin_dir.clone();
    match blocking(move || persona_plugin::discover_plugins(&root)).await {
        Ok(plugins) => (
            StatusCode::OK,
            Json(PluginsResponse {
                success: true,
                data: Some(plugins),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "plugin discovery failed");
            state.metrics.inc_http_errors();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PluginsResponse {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Serve the gateway on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    config: GatewayConfig,
    plugin_dir: PathBuf,
) -> persona_core::Result<()> {
    let router = build_router(config, plugin_dir);
    axum::serve(listener, router)
        .await
        .map_err(|e| PersonaError::Other(anyhow::anyhow!("server error: {}", e)))
}

/// Start the HTTP server.
pub async fn start_server(config: GatewayConfig, plugin_dir: PathBuf) -> persona_core::Result<()> {
    let listen = config.listen.clone();

    info!(listen = %listen, plugin_dir = %plugin_dir.display(), "starting capability gateway");

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .map_err(|e| PersonaError::Other(anyhow::anyhow!("failed to bind {}: {}", listen, e)))?;

    serve(listener, config, plugin_dir).await
}
