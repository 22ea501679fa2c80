//! Scriptable in-process sender.
//!
//! Replays queued replies in order and records every payload it receives.
//! Once the script is exhausted every send succeeds.
//!
//! # Example
//! ```ignore
//! let mock = MockSender::new();
//! mock.push_reply(MockReply::Failure("number not on WhatsApp".into())).await;
//! mock.push_reply(MockReply::Fault("connection reset".into())).await;
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use super::client::MessageSender;
use super::types::{GatewayApiResponse, GatewayError, GatewayResult, MessagePayload, ResponseCode, SendResponse};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Gateway accepted the message
    Success,
    /// Gateway answered with a structured failure
    Failure(String),
    /// The call itself broke
    Fault(String),
    /// The sender panics mid-call
    Panic,
}

#[derive(Clone, Default)]
pub struct MockSender {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<Mutex<Vec<MessagePayload>>>,
    sent: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every send by `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Payloads received so far, in call order
    pub async fn calls(&self) -> Vec<MessagePayload> {
        self.calls.lock().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send(&self, payload: &MessagePayload) -> GatewayResult<SendResponse> {
        let call = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().await.push(payload.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self.script.lock().await.pop_front().unwrap_or(MockReply::Success);
        match reply {
            MockReply::Success => {
                let data = GatewayApiResponse {
                    code: ResponseCode::Text("SUCCESS".to_string()),
                    message: "Success".to_string(),
                    results: json!({ "message_id": format!("mock-{}", call), "status": "sent" }),
                };
                Ok(SendResponse::from_send(200, data))
            }
            MockReply::Failure(error) => {
                let data = GatewayApiResponse {
                    code: ResponseCode::Number(400),
                    message: error,
                    results: json!({}),
                };
                Ok(SendResponse::from_send(400, data))
            }
            MockReply::Fault(reason) => Err(GatewayError::Fault(reason)),
            MockReply::Panic => panic!("mock sender panicked on call {}", call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_default_success() {
        let mock = MockSender::new();
        mock.push_reply(MockReply::Failure("blocked".into())).await;
        mock.push_reply(MockReply::Fault("reset".into())).await;

        let payload = MessagePayload::new("1@s.whatsapp.net", "hi", 60);

        let first = mock.send(&payload).await.unwrap();
        assert!(!first.success);
        assert_eq!(first.error.as_deref(), Some("blocked"));

        assert!(matches!(mock.send(&payload).await, Err(GatewayError::Fault(_))));

        let third = mock.send(&payload).await.unwrap();
        assert!(third.success);
        assert_eq!(third.message_id.as_deref(), Some("mock-3"));

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls().await.len(), 3);
    }
}
