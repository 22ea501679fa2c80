//! Sequential bulk dispatch.
//!
//! A [`DispatchSession`] walks a recipient list once, rendering the template
//! for each recipient and handing the result to a
//! [`MessageSender`](crate::gateway::MessageSender). Between sends it waits a
//! random pacing delay. It can be paused, resumed and cancelled from other
//! tasks while running.
//!
//! ```text
//! idle --start--> running --pause--> paused --resume--> running
//! running | paused --cancel--> cancelled
//! running --(list exhausted)--> completed
//! completed | cancelled --reset--> idle
//! ```
//!
//! The [`SessionRegistry`] keeps sessions addressable by id for the HTTP API.

mod registry;
mod session;
mod types;

pub use registry::{SessionRegistry, SessionSummary};
pub use session::DispatchSession;
pub use types::{
    DispatchConfig, DispatchError, DispatchResult, SendOutcome, SessionProgress, SessionReport,
    SessionStatus,
};
