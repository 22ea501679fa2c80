//! API layer - HTTP endpoint handlers organized by domain.

mod gateway;
mod health;
mod metrics;
mod recipients;
mod routes;
mod session;
mod template;

// Re-export all handlers for use in server/app.rs
pub use gateway::{test_gateway, validate_gateway, ValidateGatewayResponse};
pub use health::health;
pub use metrics::prometheus_metrics;
pub use recipients::{
    parse_csv_recipients, parse_manual_recipients, ParseRecipientsRequest, RecipientListResponse,
};
pub use routes::api_routes;
pub use session::{
    cancel_session, create_session, delete_session, get_session, list_sessions, pause_session,
    reset_session, resume_session, session_results, CreateSessionRequest, SessionListResponse,
    SessionResultsResponse,
};
pub use template::{
    analyze_template, render_template, AnalyzeTemplateRequest, AnalyzeTemplateResponse,
    RenderTemplateRequest,
};
