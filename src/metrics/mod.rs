//! Prometheus metrics for the bulk sender.
//!
//! This module provides metrics for monitoring dispatch activity:
//! - Session metrics (started, finished by status, active, registered)
//! - Message metrics (sends by outcome, gateway latency)
//! - Template metrics (renders, analyses)

mod helpers;

pub use helpers::{encode_metrics, MessageMetrics, SessionMetrics, TemplateMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "wa_bulk";

lazy_static! {
    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Dispatch sessions started
    pub static ref SESSIONS_STARTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_sessions_started_total", METRIC_PREFIX),
        "Total dispatch sessions started"
    ).unwrap();

    /// Dispatch sessions finished, by terminal status
    pub static ref SESSIONS_FINISHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sessions_finished_total", METRIC_PREFIX),
        "Total dispatch sessions finished",
        &["status"]
    ).unwrap();

    /// Sessions currently running or paused
    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_sessions_active", METRIC_PREFIX),
        "Number of running or paused dispatch sessions"
    ).unwrap();

    /// Sessions held by the registry
    pub static ref SESSIONS_REGISTERED: IntGauge = register_int_gauge!(
        format!("{}_sessions_registered", METRIC_PREFIX),
        "Number of sessions held in the registry"
    ).unwrap();

    // ============================================================================
    // Message Metrics
    // ============================================================================

    /// Send attempts by outcome (success, failure, fault)
    pub static ref MESSAGES_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_messages_sent_total", METRIC_PREFIX),
        "Total send attempts by outcome",
        &["outcome"]
    ).unwrap();

    /// Time spent waiting on the gateway for one send
    pub static ref SEND_LATENCY: Histogram = register_histogram!(
        format!("{}_send_latency_seconds", METRIC_PREFIX),
        "Gateway send latency in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Template Metrics
    // ============================================================================

    /// Messages rendered from templates
    pub static ref TEMPLATES_RENDERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_templates_rendered_total", METRIC_PREFIX),
        "Total template renders"
    ).unwrap();

    /// Template analyses requested through the API
    pub static ref TEMPLATES_ANALYZED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_templates_analyzed_total", METRIC_PREFIX),
        "Total template analyses"
    ).unwrap();
}
