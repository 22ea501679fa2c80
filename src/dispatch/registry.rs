use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::metrics::SessionMetrics;

use super::session::DispatchSession;
use super::types::{DispatchConfig, DispatchError, DispatchResult, SessionProgress};

/// Listing entry for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub progress: SessionProgress,
}

impl SessionSummary {
    pub fn of(session: &DispatchSession) -> Self {
        Self {
            id: session.id(),
            created_at: session.created_at(),
            progress: session.progress(),
        }
    }
}

/// Holds every dispatch session known to the service
pub struct SessionRegistry {
    /// session_id -> session
    sessions: DashMap<Uuid, Arc<DispatchSession>>,
    config: DispatchConfig,
}

impl SessionRegistry {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// Create and register a new idle session
    pub fn create(&self) -> Arc<DispatchSession> {
        let session = Arc::new(DispatchSession::new(self.config.clone()));
        self.sessions.insert(session.id(), session.clone());
        SessionMetrics::set_registered(self.sessions.len());

        tracing::info!(session_id = %session.id(), "Session registered");
        session
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<DispatchSession>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Summaries of all sessions, oldest first
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| SessionSummary::of(entry.value()))
            .collect();
        summaries.sort_by_key(|summary| summary.created_at);
        summaries
    }

    /// Drop a session that is not running or paused.
    ///
    /// Returns `Ok(None)` when the id is unknown.
    pub fn remove(&self, id: &Uuid) -> DispatchResult<Option<Arc<DispatchSession>>> {
        let removed = self
            .sessions
            .remove_if(id, |_, session| !session.status().is_active());

        match removed {
            Some((_, session)) => {
                SessionMetrics::set_registered(self.sessions.len());
                tracing::info!(session_id = %id, "Session removed");
                Ok(Some(session))
            }
            None => match self.get(id) {
                Some(session) => Err(DispatchError::InvalidTransition {
                    action: "remove",
                    status: session.status(),
                }),
                None => Ok(None),
            },
        }
    }

    /// Sessions that are running or paused
    pub fn active(&self) -> Vec<Arc<DispatchSession>> {
        self.sessions
            .iter()
            .filter(|entry| entry.value().status().is_active())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Cancel every active session, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let cancelled = self
            .active()
            .iter()
            .filter(|session| session.cancel().is_ok())
            .count();

        if cancelled > 0 {
            tracing::info!(count = cancelled, "Cancelled active sessions");
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SessionStatus;
    use crate::gateway::{MessageSender, MockSender};
    use crate::recipient::Recipient;
    use std::time::Duration;

    fn slow_registry() -> SessionRegistry {
        SessionRegistry::new(DispatchConfig {
            pacing_min: Duration::from_millis(200),
            pacing_max: Duration::from_millis(200),
            pause_poll_interval: Duration::from_millis(5),
            ..DispatchConfig::default()
        })
    }

    #[test]
    fn test_create_get_list() {
        let registry = SessionRegistry::default();
        let first = registry.create();
        let second = registry.create();

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&first.id()).is_some());

        let ids: Vec<Uuid> = registry.list().iter().map(|s| s.id).collect();
        assert!(ids.contains(&first.id()));
        assert!(ids.contains(&second.id()));
    }

    #[test]
    fn test_remove_idle_and_unknown() {
        let registry = SessionRegistry::default();
        let session = registry.create();

        assert!(registry.remove(&Uuid::new_v4()).unwrap().is_none());
        assert!(registry.remove(&session.id()).unwrap().is_some());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_refuses_active_and_cancel_all() {
        let registry = slow_registry();
        let session = registry.create();
        let sender: Arc<dyn MessageSender> = Arc::new(MockSender::new());
        let recipients = vec![
            Recipient::number("6281111111111"),
            Recipient::number("6282222222222"),
            Recipient::number("6283333333333"),
        ];

        let handle = session.start("Hi", recipients, sender).await.unwrap();
        assert!(registry.remove(&session.id()).is_err());
        assert_eq!(registry.active().len(), 1);

        assert_eq!(registry.cancel_all(), 1);
        let report = handle.await.unwrap();
        assert_eq!(report.status, SessionStatus::Cancelled);
        assert!(report.outcomes.len() < 3);

        assert!(registry.active().is_empty());
        assert!(registry.remove(&session.id()).unwrap().is_some());
    }
}
