//! Message sender abstraction and the reqwest-backed gateway client.

use std::time::Duration;

use async_trait::async_trait;

use super::types::{
    GatewayApiResponse, GatewayConfig, GatewayError, GatewayResult, MessagePayload, SendResponse,
};

/// Dummy destination for connection tests
const CHECK_PHONE: &str = "6281234567890@s.whatsapp.net";

/// Trait for delivering one rendered message.
///
/// `Ok` carries both successful and gateway-reported failed sends; `Err` is
/// reserved for faults where no structured answer was obtained.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, payload: &MessagePayload) -> GatewayResult<SendResponse>;
}

/// Production sender posting JSON to the gateway with HTTP Basic auth
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Build a client; the configuration must validate
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        config.ensure_valid()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// POST a payload and return the HTTP status with the parsed body, if any
    async fn post(&self, payload: &MessagePayload) -> GatewayResult<(u16, Option<GatewayApiResponse>)> {
        let url = self.config.send_message_url();

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Gateway request failed");
                e
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let data = serde_json::from_str::<GatewayApiResponse>(&body).ok();

        tracing::debug!(
            status = status,
            response_len = body.len(),
            parsed = data.is_some(),
            "Gateway request completed"
        );

        Ok((status, data))
    }

    /// Send a dummy message to check reachability and
    /// credentials
    #[tracing::instrument(name = "gateway.test_connection", skip(self), fields(endpoint = %self.config.endpoint))]
    pub async fn test_connection(&self) -> SendResponse {
        let check = MessagePayload::new(CHECK_PHONE, "Test connection", 3600);

        match self.post(&check).await {
            Ok((status, data)) => SendResponse::from_connection_test(status, data),
            Err(e) => {
                tracing::warn!(error = %e, "Gateway connection test failed");
                SendResponse::failed(format!("Failed to reach the API: {}", e), None)
            }
        }
    }
}

#[async_trait]
impl MessageSender for GatewayClient {
    #[tracing::instrument(name = "gateway.send", skip(self, payload), fields(phone = %payload.phone))]
    async fn send(&self, payload: &MessagePayload) -> GatewayResult<SendResponse> {
        let (status, data) = self.post(payload).await?;

        let data = data.ok_or_else(|| GatewayError::InvalidResponse {
            status,
            reason: "body is not a gateway response".to_string(),
        })?;

        let response = SendResponse::from_send(status, data);
        if !response.success {
            tracing::info!(
                status = status,
                error = ?response.error,
                "Gateway rejected message"
            );
        }

        Ok(response)
    }
}
