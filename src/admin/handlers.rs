use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::broker::{PoolSnapshot, SessionSnapshot};
use crate::http::server::AppState;
use crate::session::PoolStats;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub channels_open: usize,
    pub channels_available: usize,
    #[serde(flatten)]
    pub pools: PoolStats,
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<SystemStatus>, StatusCode> {
    let pools = state
        .broker
        .stats()
        .await
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        channels_open: state.channels.len(),
        channels_available: state.channels.available(),
        pools,
    }))
}

pub async fn get_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionSnapshot>>, StatusCode> {
    state
        .broker
        .sessions()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

pub async fn get_pools(State(state): State<AppState>) -> Result<Json<PoolSnapshot>, StatusCode> {
    state
        .broker
        .pools()
        .await
        .map(Json)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}
