//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: SessionHealthResponse,
    pub gateway: GatewayHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct SessionHealthResponse {
    pub registered: usize,
    pub active: usize,
}

#[derive(Debug, Serialize)]
pub struct GatewayHealthResponse {
    /// A default gateway is configured and passes validation
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let configured = state.settings.has_default_gateway();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        sessions: SessionHealthResponse {
            registered: state.registry.len(),
            active: state.registry.active().len(),
        },
        gateway: GatewayHealthResponse {
            configured,
            endpoint: configured.then(|| state.settings.gateway.endpoint.clone()),
        },
    })
}
