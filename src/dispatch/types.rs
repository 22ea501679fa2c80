//! Dispatch session types and error definitions

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::{ResponseCode, SendResponse};
use crate::recipient::Recipient;

/// Lifecycle of a dispatch session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Running or paused: the loop task is alive
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }

    /// Completed or cancelled: only `reset` leaves this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch-specific error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Message template must not be blank")]
    EmptyTemplate,

    #[error("No recipients to send to")]
    NoRecipients,

    #[error("Too many recipients: {count} (limit {limit})")]
    TooManyRecipients { count: usize, limit: usize },

    #[error("Cannot {action} a session that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Runtime configuration of the dispatch loop
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Lower bound of the delay between two sends
    pub pacing_min: Duration,
    /// Upper bound of the delay between two sends
    pub pacing_max: Duration,
    /// How often a paused loop re-checks its status
    pub pause_poll_interval: Duration,
    /// Time-to-live attached to every outgoing message, in seconds
    pub message_ttl_seconds: u64,
    /// Upper bound on one sender call; `None` waits indefinitely
    pub send_timeout: Option<Duration>,
    /// Largest recipient list a session accepts
    pub max_recipients: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pacing_min: Duration::from_millis(1000),
            pacing_max: Duration::from_millis(2000),
            pause_poll_interval: Duration::from_millis(100),
            message_ttl_seconds: 3600,
            send_timeout: None,
            max_recipients: 10_000,
        }
    }
}

/// Immutable record of one send attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendOutcome {
    pub recipient: Recipient,
    pub rendered_message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_response_code: Option<ResponseCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_response_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_response_payload: Option<serde_json::Value>,
}

impl SendOutcome {
    /// Outcome built from a structured gateway answer
    pub fn from_response(recipient: Recipient, rendered_message: String, response: SendResponse) -> Self {
        let (code, message, payload) = match &response.data {
            Some(data) => (
                Some(data.code.clone()),
                Some(data.message.clone()),
                serde_json::to_value(data).ok(),
            ),
            None => (None, None, None),
        };

        Self {
            recipient,
            rendered_message,
            success: response.success,
            error_detail: response.error,
            sent_at: Utc::now(),
            external_message_id: response.message_id,
            external_response_code: code,
            external_response_message: message,
            external_response_payload: payload,
        }
    }

    /// Outcome for a send that faulted before producing an answer
    pub fn fault(recipient: Recipient, rendered_message: String, detail: impl fmt::Display) -> Self {
        Self {
            recipient,
            rendered_message,
            success: false,
            error_detail: Some(format!("Unexpected error while sending: {}", detail)),
            sent_at: Utc::now(),
            external_message_id: None,
            external_response_code: None,
            external_response_message: None,
            external_response_payload: None,
        }
    }
}

/// Observable snapshot of a session, republished on every change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProgress {
    pub status: SessionStatus,
    /// Index of the recipient being (or last) processed
    pub current_index: usize,
    /// Outcomes recorded so far
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_recipient: Option<String>,
}

impl SessionProgress {
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            current_index: 0,
            processed: 0,
            total: 0,
            succeeded: 0,
            failed: 0,
            progress_percent: 0.0,
            current_recipient: None,
        }
    }

    pub(crate) fn record(&mut self, index: usize, success: bool) {
        self.processed = index + 1;
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.progress_percent = if self.total == 0 {
            0.0
        } else {
            (index + 1) as f64 / self.total as f64 * 100.0
        };
    }
}

impl Default for SessionProgress {
    fn default() -> Self {
        Self::idle()
    }
}

/// Final output of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<SendOutcome>,
}

impl SessionReport {
    pub fn new(status: SessionStatus, total: usize, outcomes: Vec<SendOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        Self {
            status,
            total,
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        }
    }
}
