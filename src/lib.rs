// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer
pub mod dispatch;
pub mod gateway;
pub mod recipient;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod sse;

// Supporting modules
pub mod shutdown;
