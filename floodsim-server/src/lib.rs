//! HTTP surface: the control API (configure/stop/metrics/logs/blacklist)
//! and the built-in victim endpoints (`/limited`, `/open`) behind the
//! blacklist gate, all on one router as in the original simulator.

use arc_swap::ArcSwap;
use axum::{
    extract::{connect_info::ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use floodsim::tasks::blacklist_eviction_task;
use floodsim::{AttackOrchestrator, SharedState};
use floodsim_core::{AttackConfig, AttackMode, ConfigError, EventEntry, MetricsSnapshot};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_RATE_LIMIT: u32 = 5;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO Error")]
    IoError(#[from] std::io::Error),
}

pub struct ServerState {
    orchestrator: AttackOrchestrator,
    shared: SharedState,
    // Swapped wholesale on /configure so a new quota takes effect without
    // carrying over the old limiter's counters.
    limiter: ArcSwap<DefaultKeyedRateLimiter<String>>,
    rate_limit: AtomicU32,
}

impl ServerState {
    /// `base_url` is where workers send their traffic; point it at this
    /// server's own address to attack the built-in victim endpoints.
    pub fn new(base_url: impl Into<String>) -> Arc<Self> {
        let shared = SharedState::new();
        Arc::new(Self {
            orchestrator: AttackOrchestrator::new(shared.clone(), base_url),
            shared,
            limiter: ArcSwap::from_pointee(per_minute_limiter(DEFAULT_RATE_LIMIT)),
            rate_limit: AtomicU32::new(DEFAULT_RATE_LIMIT),
        })
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn orchestrator(&self) -> &AttackOrchestrator {
        &self.orchestrator
    }

    /// Spawns the process-lifetime blacklist eviction ticker; never joined.
    pub fn spawn_background_tasks(self: &Arc<Self>) {
        tokio::spawn(blacklist_eviction_task(
            Arc::clone(&self.shared.blacklist),
            Arc::clone(&self.shared.events),
        ));
    }
}

fn per_minute_limiter(per_minute: u32) -> DefaultKeyedRateLimiter<String> {
    RateLimiter::keyed(Quota::per_minute(
        NonZeroU32::new(per_minute.max(1)).unwrap(),
    ))
}

pub async fn run(addr: SocketAddr, state: Arc<ServerState>) -> Result<(), ServerError> {
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    debug!("floodsim server starting on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/configure", post(configure))
        .route("/stop", post(stop))
        .route("/metrics", get(metrics))
        .route("/metrics/history", get(metrics_history))
        .route("/logs", get(logs))
        .route("/blacklist/:ip", post(blacklist_add).delete(blacklist_remove))
        .route("/limited", get(limited))
        .route("/open", get(open))
        // Innermost layer: the gate must reject before any rate-limit
        // accounting in the handlers happens.
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            blacklist_gate,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[derive(Error, Debug)]
enum HandlerError {
    #[error("invalid attack config: {0}")]
    Config(#[from] ConfigError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Config(err) => {
                (StatusCode::UNPROCESSABLE_ENTITY, format!("{err}")).into_response()
            }
        }
    }
}

/// First X-Forwarded-For value when present (workers spoof through it),
/// otherwise the socket peer address.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| peer.ip().to_string())
}

async fn blacklist_gate(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers(), peer);
    if state.shared.blacklist.contains(&ip) {
        debug!("rejected blacklisted client {ip}");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    next.run(request).await
}

#[derive(Debug, Serialize)]
struct ConfigureResponse {
    message: String,
    mode: AttackMode,
    thread_count: usize,
    target_url: String,
    rate_limit: u32,
}

#[instrument(skip(state))]
async fn configure(
    State(state): State<Arc<ServerState>>,
    Json(config): Json<AttackConfig>,
) -> Result<Json<ConfigureResponse>, HandlerError> {
    config.validate()?;

    // Retune the victim before the workers start hammering it.
    let rate_limit = config.rate_limit_hint;
    state
        .limiter
        .store(Arc::new(per_minute_limiter(rate_limit)));
    state.rate_limit.store(rate_limit, Ordering::Relaxed);

    let started = state.orchestrator.configure_and_start(config).await?;

    Ok(Json(ConfigureResponse {
        message: "Configuration updated and DoS attack initiated".to_string(),
        mode: started.mode,
        thread_count: started.thread_count,
        target_url: started.target_url,
        rate_limit,
    }))
}

async fn stop(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    state.orchestrator.stop().await;
    Json(serde_json::json!({ "message": "Attack stopped" }))
}

async fn metrics(State(state): State<Arc<ServerState>>) -> Json<MetricsSnapshot> {
    Json(state.shared.metrics.snapshot())
}

async fn metrics_history(State(state): State<Arc<ServerState>>) -> Json<Vec<MetricsSnapshot>> {
    Json(state.orchestrator.snapshot_history())
}

async fn logs(State(state): State<Arc<ServerState>>) -> Json<Vec<EventEntry>> {
    Json(state.shared.events.entries())
}

async fn blacklist_add(
    State(state): State<Arc<ServerState>>,
    Path(ip): Path<String>,
) -> Json<serde_json::Value> {
    state.shared.blacklist.add(&ip);
    Json(serde_json::json!({ "message": format!("IP {ip} added to blacklist.") }))
}

async fn blacklist_remove(
    State(state): State<Arc<ServerState>>,
    Path(ip): Path<String>,
) -> Json<serde_json::Value> {
    state.shared.blacklist.remove(&ip);
    Json(serde_json::json!({ "message": format!("IP {ip} removed from blacklist.") }))
}

async fn limited(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ip = client_ip(&headers, peer);
    match state.limiter.load().check_key(&ip) {
        Ok(_) => {
            let rate_limit = state.rate_limit.load(Ordering::Relaxed);
            Json(serde_json::json!({
                "message": format!(
                    "This endpoint is rate limited to {rate_limit} requests per minute."
                )
            }))
            .into_response()
        }
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
    }
}

async fn open() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "This endpoint has no rate limiting." }))
}
