use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use pimon_core::{MonitorError, SystemMonitor};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::routes;

#[derive(Clone)]
pub struct AppState {
    pub monitor: SystemMonitor,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(monitor: SystemMonitor) -> Self {
        Self {
            monitor,
            started_at: Utc::now(),
        }
    }
}

/// Failure of a reading, answered with a 500 and a short plain-text body
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("reading {resource} info failed: {source}")]
    Monitor {
        resource: &'static str,
        #[source]
        source: MonitorError,
    },

    #[error("reading {resource} info panicked or was cancelled: {source}")]
    Task {
        resource: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ApiError {
    fn resource(&self) -> &'static str {
        match self {
            ApiError::Monitor { resource, .. } | ApiError::Task { resource, .. } => resource,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "Error retrieving {} info", self.resource());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to retrieve {} info\n", self.resource()),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/v1/cpu", get(routes::get_cpu_load))
        .route("/v1/ram", get(routes::get_ram_info))
        .route("/v1/storage", get(routes::get_storage_info))
        .route("/v1/network", get(routes::get_network_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
