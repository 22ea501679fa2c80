//! Gateway wire types, configuration and error definitions

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recipient::clean_phone_number;

/// Addressing suffix the gateway expects on every destination
pub const WHATSAPP_SUFFIX: &str = "@s.whatsapp.net";

/// Gateway-specific error type.
///
/// These are faults (the call itself broke), as opposed to a structured
/// failure reported by the gateway in a [`SendResponse`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid gateway configuration: {}", .0.join(", "))]
    InvalidConfig(Vec<String>),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unreadable gateway response (HTTP {status}): {reason}")]
    InvalidResponse { status: u16, reason: String },

    #[error("Gateway did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Sender fault: {0}")]
    Fault(String),
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Connection settings for the WhatsApp HTTP gateway
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Absolute base URL, e.g. `https://wa.example.com`
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// Per-request HTTP timeout; unset means no client-side limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl GatewayConfig {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            request_timeout_ms: None,
        }
    }

    /// List every configuration problem; empty means usable
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            errors.push("API endpoint is required".to_string());
        } else if reqwest::Url::parse(endpoint).is_err() {
            errors.push("API endpoint is not a valid URL".to_string());
        }

        if self.username.trim().is_empty() {
            errors.push("Username is required".to_string());
        }

        if self.password.trim().is_empty() {
            errors.push("Password is required".to_string());
        }

        errors
    }

    /// Validate, turning problems into an error
    pub fn ensure_valid(&self) -> GatewayResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::InvalidConfig(errors))
        }
    }

    /// Full URL of the send-message route
    pub fn send_message_url(&self) -> String {
        format!("{}/send/message", self.endpoint.trim().trim_end_matches('/'))
    }
}

/// Normalize a phone number into a gateway address.
///
/// Keeps digits and `+`, drops a leading `+`, appends [`WHATSAPP_SUFFIX`].
pub fn format_phone_number(phone: &str) -> String {
    let cleaned = clean_phone_number(phone);
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    format!("{}{}", digits, WHATSAPP_SUFFIX)
}

/// JSON body of a send-message request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Normalized destination, see [`format_phone_number`]
    pub phone: String,
    pub message: String,
    pub reply_message_id: Option<String>,
    pub is_forwarded: bool,
    /// Message time-to-live in seconds
    pub duration: u64,
}

impl MessagePayload {
    /// Fresh, non-forwarded, non-reply message
    pub fn new(phone: impl Into<String>, message: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            phone: phone.into(),
            message: message.into(),
            reply_message_id: None,
            is_forwarded: false,
            duration: ttl_seconds,
        }
    }
}

/// The gateway reports codes either as strings (`"SUCCESS"`) or numbers (`400`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseCode {
    Number(i64),
    Text(String),
}

impl ResponseCode {
    pub fn is_text(&self, expected: &str) -> bool {
        matches!(self, ResponseCode::Text(code) if code == expected)
    }

    pub fn is_number(&self, expected: i64) -> bool {
        matches!(self, ResponseCode::Number(code) if *code == expected)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Number(code) => write!(f, "{}", code),
            ResponseCode::Text(code) => f.write_str(code),
        }
    }
}

/// Raw response body returned by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayApiResponse {
    pub code: ResponseCode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub results: serde_json::Value,
}

impl GatewayApiResponse {
    /// `results.message_id`, when the gateway returned one
    pub fn message_id(&self) -> Option<String> {
        self.results
            .get("message_id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
    }

    fn message_or(&self, fallback: &str) -> String {
        if self.message.is_empty() {
            fallback.to_string()
        } else {
            self.message.clone()
        }
    }
}

/// Outcome of one send as classified from the gateway response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<GatewayApiResponse>,
}

impl SendResponse {
    pub fn succeeded(message: impl Into<String>, data: Option<GatewayApiResponse>) -> Self {
        let message_id = data.as_ref().and_then(GatewayApiResponse::message_id);
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            message_id,
            data,
        }
    }

    pub fn failed(error: impl Into<String>, data: Option<GatewayApiResponse>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            message_id: None,
            data,
        }
    }

    /// Classify a send-message response.
    ///
    /// HTTP 200 or code `SUCCESS` wins over any failure code in the body.
    pub fn from_send(status: u16, data: GatewayApiResponse) -> Self {
        if data.code.is_text("SUCCESS") || status == 200 {
            let message = data.message_or("Message sent");
            Self::succeeded(message, Some(data))
        } else if data.code.is_number(400) {
            let error = data.message_or("Field cannot be blank");
            Self::failed(error, Some(data))
        } else if data.code.is_text("INTERNAL_SERVER_ERROR") || status == 500 {
            let error = data.message_or("Internal server error");
            Self::failed(error, Some(data))
        } else {
            let error = data.message_or(&format!("HTTP {}", status));
            Self::failed(error, Some(data))
        }
    }

    /// Classify a connection-test response.
    ///
    /// A gateway-shaped answer counts as reachable unless it rejects the
    /// credentials. A body that is not a gateway response is a failure.
    pub fn from_connection_test(status: u16, data: Option<GatewayApiResponse>) -> Self {
        let not_logged_in = data.as_ref().is_some_and(|d| {
            d.code.is_text("INTERNAL_SERVER_ERROR") && d.message == "you are not loggin"
        });

        if not_logged_in || status == 401 {
            return Self::failed("Invalid username or password", data);
        }

        if status == 404 {
            return Self::failed("Endpoint not found", data);
        }

        let Some(data) = data else {
            return Self::failed(
                format!("Failed to reach the API: HTTP {} without a gateway response", status),
                None,
            );
        };

        let message = if data.code.is_number(400) {
            "API connection OK (endpoint reachable)"
        } else if data.code.is_text("SUCCESS") {
            "API connection OK"
        } else {
            "API connection OK (endpoint responded)"
        };
        Self::succeeded(message, Some(data))
    }
}
