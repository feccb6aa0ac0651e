//! Liveness endpoints
//!
//! - GET /ping   - `{"ping": "pong"}`
//! - GET /health - version, store backend and uptime; 503 if the store is down

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::helpers::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct PingResponse {
    pub ping: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// "online" or "degraded"
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn ping() -> Response<BoxBody> {
    json_response(StatusCode::OK, &PingResponse { ping: "pong" })
}

pub async fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let store_check = state.store.ping().await;
    let healthy = store_check.is_ok();

    let response = HealthResponse {
        healthy,
        status: if healthy { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.backend_name(),
        uptime: state.started_at.elapsed().as_secs(),
        error: store_check.err().map(|e| e.to_string()),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, &response)
}
