//! Graceful shutdown handling for the bulk sender.
//!
//! This module provides coordinated shutdown functionality that:
//! 1. Cancels every running or paused dispatch session
//! 2. Waits (bounded) for their loops to finish the send in flight
//!
//! A send already handed to the gateway is never interrupted; cancellation
//! takes effect at the loop's next checkpoint.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::timeout;

use crate::dispatch::SessionRegistry;

/// Configuration for graceful shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Time to wait for cancelled sessions to stop (default: 30 seconds)
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Handles graceful shutdown of dispatch sessions
pub struct GracefulShutdown {
    registry: Arc<SessionRegistry>,
    config: ShutdownConfig,
}

impl GracefulShutdown {
    /// Create a new graceful shutdown handler
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self::with_config(registry, ShutdownConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(registry: Arc<SessionRegistry>, config: ShutdownConfig) -> Self {
        Self { registry, config }
    }

    /// Execute graceful shutdown sequence
    ///
    /// Returns a ShutdownResult with details about the shutdown process
    #[tracing::instrument(
        name = "graceful_shutdown",
        skip(self),
        fields(registered_sessions = self.registry.len())
    )]
    pub async fn execute(&self, reason: &str) -> ShutdownResult {
        let start = std::time::Instant::now();
        let mut result = ShutdownResult::default();

        // Snapshot before cancelling: cancelled sessions are no longer active
        let active = self.registry.active();

        // Phase 1: Cancel active sessions
        tracing::info!(reason = %reason, "Starting graceful shutdown - Phase 1: Cancelling sessions");
        result.sessions_cancelled = self.registry.cancel_all();

        // Phase 2: Wait for their loops to stop
        tracing::info!("Phase 2: Waiting for dispatch loops to stop");
        let mut waits: FuturesUnordered<_> = active
            .iter()
            .map(|session| session.wait_finished())
            .collect();

        let mut stopped = 0;
        let drain = async {
            while let Some(report) = waits.next().await {
                if report.is_some() {
                    stopped += 1;
                }
            }
        };

        result.success = timeout(self.config.drain_timeout, drain).await.is_ok();
        result.sessions_stopped = stopped;
        if !result.success {
            tracing::warn!(
                timeout_secs = self.config.drain_timeout.as_secs(),
                "Some dispatch loops did not stop before the shutdown timeout"
            );
        }

        result.duration = start.elapsed();

        tracing::info!(
            sessions_cancelled = result.sessions_cancelled,
            sessions_stopped = result.sessions_stopped,
            duration_ms = result.duration.as_millis(),
            "Graceful shutdown completed"
        );

        result
    }
}

/// Result of a graceful shutdown operation
#[derive(Debug, Default)]
pub struct ShutdownResult {
    /// Whether every loop stopped within the timeout
    pub success: bool,
    /// Number of sessions that were cancelled
    pub sessions_cancelled: usize,
    /// Number of loops that finished and produced a report
    pub sessions_stopped: usize,
    /// Total time taken for shutdown
    pub duration: Duration,
}
