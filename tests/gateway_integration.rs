//! Gateway client integration tests
//!
//! A local axum server stands in for the WhatsApp gateway so the client's
//! HTTP plumbing (Basic auth, JSON body, response classification) runs
//! end to end.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use wa_bulk_sender::dispatch::{DispatchConfig, DispatchSession, SessionStatus};
use wa_bulk_sender::gateway::{
    GatewayClient, GatewayConfig, GatewayError, MessagePayload, MessageSender,
};
use wa_bulk_sender::recipient::Recipient;

/// base64("admin:secret")
const EXPECTED_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

const OK_PHONE: &str = "6281111111111@s.whatsapp.net";
const BLANK_PHONE: &str = "6289999999999@s.whatsapp.net";
const CHECK_PHONE: &str = "6281234567890@s.whatsapp.net";

async fn fake_send_message(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(EXPECTED_AUTH);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "INTERNAL_SERVER_ERROR", "message": "you are not loggin", "results": null})),
        );
    }

    // Every request carries the full payload
    assert!(body["message"].is_string());
    assert_eq!(body["is_forwarded"], json!(false));
    assert!(body["duration"].is_u64());

    match body["phone"].as_str() {
        Some(OK_PHONE) => (
            StatusCode::OK,
            Json(json!({
                "code": "SUCCESS",
                "message": "Success",
                "results": {"message_id": "3EB0A1", "status": "sent"}
            })),
        ),
        Some(BLANK_PHONE) | Some(CHECK_PHONE) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": 400, "message": "", "results": {}})),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"code": "INTERNAL_SERVER_ERROR", "message": "", "results": {}})),
        ),
    }
}

async fn broken_send_message() -> &'static str {
    "<html>maintenance</html>"
}

/// Start the fake gateway and return its base URL
async fn spawn_gateway() -> String {
    let app = Router::new()
        .route("/send/message", post(fake_send_message))
        .route("/broken/send/message", post(broken_send_message));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn client(endpoint: &str, password: &str) -> GatewayClient {
    let mut config = GatewayConfig::new(endpoint, "admin", password);
    config.request_timeout_ms = Some(5_000);
    GatewayClient::new(config).unwrap()
}

// ============================================================================
// Send classification
// ============================================================================

#[tokio::test]
async fn test_send_success_carries_message_id() {
    let endpoint = spawn_gateway().await;
    let client = client(&endpoint, "secret");

    let response = client
        .send(&MessagePayload::new(OK_PHONE, "Halo", 3600))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.message.as_deref(), Some("Success"));
    assert_eq!(response.message_id.as_deref(), Some("3EB0A1"));
}

#[tokio::test]
async fn test_send_failures_use_default_messages() {
    let endpoint = spawn_gateway().await;
    let client = client(&endpoint, "secret");

    let blank = client
        .send(&MessagePayload::new(BLANK_PHONE, "Halo", 3600))
        .await
        .unwrap();
    assert!(!blank.success);
    assert_eq!(blank.error.as_deref(), Some("Field cannot be blank"));

    let server_error = client
        .send(&MessagePayload::new("6287777777777@s.whatsapp.net", "Halo", 3600))
        .await
        .unwrap();
    assert!(!server_error.success);
    assert_eq!(server_error.error.as_deref(), Some("Internal server error"));
}

#[tokio::test]
async fn test_unreadable_body_is_a_fault() {
    let endpoint = spawn_gateway().await;
    let client = client(&format!("{}/broken/", endpoint), "secret");

    let result = client.send(&MessagePayload::new(OK_PHONE, "Halo", 3600)).await;
    assert!(matches!(
        result,
        Err(GatewayError::InvalidResponse { status: 200, .. })
    ));
}

#[tokio::test]
async fn test_unreachable_gateway_is_a_fault() {
    let client = client("http://127.0.0.1:1", "secret");

    let result = client.send(&MessagePayload::new(OK_PHONE, "Halo", 3600)).await;
    assert!(matches!(result, Err(GatewayError::Http(_))));
}

// ============================================================================
// Connection test
// ============================================================================

#[tokio::test]
async fn test_connection_ok_when_dummy_send_rejected_as_bad_request() {
    let endpoint = spawn_gateway().await;

    let response = client(&endpoint, "secret").test_connection().await;
    assert!(response.success);
    assert_eq!(
        response.message.as_deref(),
        Some("API connection OK (endpoint reachable)")
    );
}

#[tokio::test]
async fn test_connection_reports_bad_credentials() {
    let endpoint = spawn_gateway().await;

    let response = client(&endpoint, "wrong").test_connection().await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Invalid username or password"));
}

#[tokio::test]
async fn test_connection_reports_missing_endpoint() {
    let endpoint = spawn_gateway().await;

    let response = client(&format!("{}/missing", endpoint), "secret")
        .test_connection()
        .await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Endpoint not found"));
}

#[tokio::test]
async fn test_connection_fails_on_non_gateway_body() {
    let endpoint = spawn_gateway().await;

    let response = client(&format!("{}/broken/", endpoint), "secret")
        .test_connection()
        .await;
    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Failed to reach the API: HTTP 200 without a gateway response")
    );
}

#[tokio::test]
async fn test_connection_unreachable() {
    let response = client("http://127.0.0.1:1", "secret").test_connection().await;
    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("Failed to reach the API"));
}

// ============================================================================
// Session over HTTP
// ============================================================================

#[tokio::test]
async fn test_session_through_gateway_client() {
    let endpoint = spawn_gateway().await;
    let sender: Arc<dyn MessageSender> = Arc::new(client(&endpoint, "secret"));

    let session = Arc::new(DispatchSession::new(DispatchConfig {
        pacing_min: Duration::from_millis(5),
        pacing_max: Duration::from_millis(10),
        ..DispatchConfig::default()
    }));
    let recipients = vec![
        Recipient::contact("Budi", "+6281111111111"),
        Recipient::number("6289999999999"),
    ];

    let handle = session
        .start("Halo [[nama]]", recipients, sender)
        .await
        .unwrap();
    let report = handle.await.unwrap();

    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let delivered = &report.outcomes[0];
    assert_eq!(delivered.rendered_message, "Halo Budi");
    assert_eq!(delivered.external_message_id.as_deref(), Some("3EB0A1"));

    let rejected = &report.outcomes[1];
    assert_eq!(rejected.rendered_message, "Halo");
    assert_eq!(rejected.error_detail.as_deref(), Some("Field cannot be blank"));
    assert_eq!(
        rejected.external_response_payload.as_ref().unwrap()["code"],
        json!(400)
    );
}
