//! Gateway configuration checks.

use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::gateway::{GatewayClient, GatewayConfig, SendResponse};

#[derive(Debug, Serialize)]
pub struct ValidateGatewayResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// POST /api/v1/gateway/validate - Check a configuration without contacting it
pub async fn validate_gateway(Json(config): Json<GatewayConfig>) -> Json<ValidateGatewayResponse> {
    let errors = config.validate();

    Json(ValidateGatewayResponse {
        valid: errors.is_empty(),
        errors,
    })
}

/// POST /api/v1/gateway/test - Send the gateway a dummy message
#[tracing::instrument(name = "http.test_gateway", skip(config), fields(endpoint = %config.endpoint))]
pub async fn test_gateway(Json(config): Json<GatewayConfig>) -> Result<Json<SendResponse>> {
    let client = GatewayClient::new(config)?;
    Ok(Json(client.test_connection().await))
}
