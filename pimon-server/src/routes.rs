use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use pimon_core::{CpuLoad, Device, NetworkInterface, RamStats, SystemMonitor};
use serde::Serialize;
use tracing::{info, instrument};

use crate::app::{ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        started_at: state.started_at,
    })
}

/// Runs a blocking reading on the blocking pool so file reads and `df`
/// never stall the runtime
async fn read<T, F>(state: AppState, resource: &'static str, reading: F) -> Result<Json<T>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SystemMonitor) -> pimon_core::Result<T> + Send + 'static,
{
    let monitor = state.monitor;
    let value = tokio::task::spawn_blocking(move || reading(&monitor))
        .await
        .map_err(|source| ApiError::Task { resource, source })?
        .map_err(|source| ApiError::Monitor { resource, source })?;

    info!("{} info retrieved successfully", resource);
    Ok(Json(value))
}

#[instrument(skip_all)]
pub async fn get_cpu_load(State(state): State<AppState>) -> Result<Json<CpuLoad>, ApiError> {
    read(state, "CPU", SystemMonitor::get_cpu_load).await
}

#[instrument(skip_all)]
pub async fn get_ram_info(State(state): State<AppState>) -> Result<Json<RamStats>, ApiError> {
    read(state, "RAM", SystemMonitor::get_ram_stats).await
}

#[instrument(skip_all)]
pub async fn get_storage_info(
    State(state): State<AppState>,
) -> Result<Json<Vec<Device>>, ApiError> {
    read(state, "storage", SystemMonitor::get_devices).await
}

#[instrument(skip_all)]
pub async fn get_network_info(
    State(state): State<AppState>,
) -> Result<Json<Vec<NetworkInterface>>, ApiError> {
    read(state, "network", SystemMonitor::get_network_interfaces).await
}
