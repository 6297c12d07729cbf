//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, timeout)
//! - Serve plain TCP or TLS with graceful shutdown

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use axum_server::Handle;
use serde::Serialize;
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::broker::BrokerHandle;
use crate::config::SharedConfig;
use crate::http::websocket::ws_handler;
use crate::lifecycle::Shutdown;
use crate::net::{tls::load_tls_config, ChannelMap};
use crate::session::PoolStats;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: BrokerHandle,
    pub channels: ChannelMap,
    pub config: SharedConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(broker: BrokerHandle, channels: ChannelMap, config: SharedConfig) -> Self {
        Self {
            broker,
            channels,
            config,
            started_at: Instant::now(),
        }
    }
}

/// HTTP and WebSocket front end.
pub struct HttpServer {
    router: Router,
    config: SharedConfig,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.load_full();

        let mut router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/", get(index))
            .route("/api/stats", get(api_stats))
            .route("/api/ping", get(api_ping))
            .route("/health", get(health))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
            tracing::info!("Admin routes enabled");
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                ))),
        )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let config = self.config.load_full();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        match &config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await?;
                let handle = Handle::new();
                let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
                let mut rx = shutdown.subscribe();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = rx.recv().await;
                    shutdown_handle.graceful_shutdown(Some(grace));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                let mut rx = shutdown.subscribe();
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(flatten)]
    pub pools: PoolStats,
    pub channels_open: usize,
    pub uptime_secs: u64,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub message: &'static str,
    pub timestamp: u64,
    pub server_healthy: bool,
}

async fn index(State(state): State<AppState>) -> Result<String, StatusCode> {
    let stats = state
        .broker
        .stats()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(format!(
        "interpreter-relay {version}\n\
         \n\
         sessions:            {sessions}\n\
         providers available: {providers}\n\
         requesters waiting:  {requesters}\n\
         \n\
         WebSocket endpoint: /ws\n",
        version = env!("CARGO_PKG_VERSION"),
        sessions = stats.sessions,
        providers = stats.providers_available,
        requesters = stats.requesters_waiting,
    ))
}

async fn api_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, StatusCode> {
    let pools = state
        .broker
        .stats()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(StatsResponse {
        status: "online",
        timestamp: unix_millis(),
        pools,
        channels_open: state.channels.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

async fn api_ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong",
        timestamp: unix_millis(),
        server_healthy: true,
    })
}

async fn health() -> &'static str {
    "OK"
}
