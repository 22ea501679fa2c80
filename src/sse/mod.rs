//! Server-Sent Events stream of dispatch progress.
//!
//! # Endpoint
//!
//! `GET /api/v1/sessions/{id}/events`
//!
//! # Event Types
//!
//! - `progress` - JSON `SessionProgress` snapshot, sent on every change
//! - `error` - Serialization failure (should not happen)
//!
//! The stream closes once the send loop has published its final report, so
//! an outcome that lands after `cancel` is still streamed. Keep-alive
//! comments are sent between changes.

mod handler;

pub use handler::{progress_stream, session_events};
