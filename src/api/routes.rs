use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;
use crate::sse::session_events;

use super::gateway::{test_gateway, validate_gateway};
use super::health::health;
use super::metrics::prometheus_metrics;
use super::recipients::{parse_csv_recipients, parse_manual_recipients};
use super::session::{
    cancel_session, create_session, delete_session, get_session, list_sessions, pause_session,
    reset_session, resume_session, session_results,
};
use super::template::{analyze_template, render_template};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Composer helpers
                .route("/templates/analyze", post(analyze_template))
                .route("/templates/render", post(render_template))
                .route("/recipients/csv", post(parse_csv_recipients))
                .route("/recipients/manual", post(parse_manual_recipients))
                .route("/gateway/validate", post(validate_gateway))
                .route("/gateway/test", post(test_gateway))
                // Sessions
                .route("/sessions", post(create_session).get(list_sessions))
                .route("/sessions/{id}", get(get_session).delete(delete_session))
                .route("/sessions/{id}/results", get(session_results))
                .route("/sessions/{id}/events", get(session_events))
                // Session control
                .route("/sessions/{id}/pause", post(pause_session))
                .route("/sessions/{id}/resume", post(resume_session))
                .route("/sessions/{id}/cancel", post(cancel_session))
                .route("/sessions/{id}/reset", post(reset_session)),
        )
}
