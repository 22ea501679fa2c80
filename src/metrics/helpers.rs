//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    MESSAGES_SENT_TOTAL, SEND_LATENCY, SESSIONS_ACTIVE, SESSIONS_FINISHED_TOTAL,
    SESSIONS_REGISTERED, SESSIONS_STARTED_TOTAL, TEMPLATES_ANALYZED_TOTAL,
    TEMPLATES_RENDERED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording session lifecycle metrics
pub struct SessionMetrics;

impl SessionMetrics {
    /// Record a session entering `running`
    pub fn record_started() {
        SESSIONS_STARTED_TOTAL.inc();
        SESSIONS_ACTIVE.inc();
    }

    /// Record a session reaching a terminal status
    pub fn record_finished(status: &str) {
        SESSIONS_FINISHED_TOTAL.with_label_values(&[status]).inc();
        SESSIONS_ACTIVE.dec();
    }

    /// Update the registry size
    pub fn set_registered(count: usize) {
        SESSIONS_REGISTERED.set(count as i64);
    }
}

/// Helper struct for recording send metrics
pub struct MessageMetrics;

impl MessageMetrics {
    /// Record a send accepted by the gateway
    pub fn record_success(latency: Duration) {
        MESSAGES_SENT_TOTAL.with_label_values(&["success"]).inc();
        SEND_LATENCY.observe(latency.as_secs_f64());
    }

    /// Record a send rejected by the gateway
    pub fn record_failure(latency: Duration) {
        MESSAGES_SENT_TOTAL.with_label_values(&["failure"]).inc();
        SEND_LATENCY.observe(latency.as_secs_f64());
    }

    /// Record a send that faulted (error, panic or timeout)
    pub fn record_fault() {
        MESSAGES_SENT_TOTAL.with_label_values(&["fault"]).inc();
    }
}

/// Helper struct for template metrics
pub struct TemplateMetrics;

impl TemplateMetrics {
    pub fn record_rendered() {
        TEMPLATES_RENDERED_TOTAL.inc();
    }

    pub fn record_analyzed() {
        TEMPLATES_ANALYZED_TOTAL.inc();
    }
}
