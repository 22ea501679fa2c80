//! SSE handler implementation.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::watch;
use uuid::Uuid;

use crate::dispatch::{SessionProgress, SessionReport, SessionStatus};
use crate::error::{AppError, Result};
use crate::server::AppState;

/// Interval between keep-alive comments
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// GET /api/v1/sessions/{id}/events - Stream progress snapshots
#[tracing::instrument(name = "sse.session_events", skip(state))]
pub async fn session_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let session = state
        .registry
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;

    tracing::debug!(session_id = %id, "SSE subscriber attached");

    Ok(Sse::new(progress_stream(session.subscribe(), session.subscribe_report())).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    ))
}

struct StreamState {
    progress: watch::Receiver<SessionProgress>,
    report: watch::Receiver<Option<SessionReport>>,
    first: bool,
    finished: bool,
}

/// One `progress` event per observed change.
///
/// The stream ends once the loop has published its report, so the snapshot
/// carrying the last outcome is always delivered. An idle session yields a
/// single event.
pub fn progress_stream(
    progress: watch::Receiver<SessionProgress>,
    report: watch::Receiver<Option<SessionReport>>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    let state = StreamState {
        progress,
        report,
        first: true,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            let progress_changed = if state.first {
                true
            } else {
                // Either sender dropped: the session is gone
                tokio::select! {
                    changed = state.progress.changed() => {
                        changed.ok()?;
                        true
                    }
                    changed = state.report.changed() => {
                        changed.ok()?;
                        state.progress.has_changed().unwrap_or(false)
                    }
                }
            };
            state.first = false;

            let stopped = state.report.borrow_and_update().is_some();
            if !progress_changed {
                if stopped {
                    return None;
                }
                continue;
            }

            let snapshot = state.progress.borrow_and_update().clone();
            state.finished = stopped || snapshot.status == SessionStatus::Idle;
            return Some((snapshot, state));
        }
    })
    .map(|progress| Ok(progress_event(&progress)))
}

fn progress_event(progress: &SessionProgress) -> Event {
    match Event::default().event("progress").json_data(progress) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize SSE progress");
            Event::default()
                .event("error")
                .data(format!(r#"{{"code":"SERIALIZATION_ERROR","message":"{}"}}"#, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(total: usize) -> SessionProgress {
        SessionProgress {
            status: SessionStatus::Running,
            total,
            ..SessionProgress::idle()
        }
    }

    #[tokio::test]
    async fn test_stream_ends_after_report() {
        let (progress_tx, progress_rx) = watch::channel(running(2));
        let (report_tx, report_rx) = watch::channel(None);

        let mut stream = Box::pin(progress_stream(progress_rx, report_rx));
        assert!(stream.next().await.is_some());

        progress_tx.send_modify(|p| p.status = SessionStatus::Completed);
        assert!(stream.next().await.is_some());

        // Only the report closes the stream, without repeating the snapshot
        report_tx.send_replace(Some(SessionReport::new(SessionStatus::Completed, 2, Vec::new())));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_still_delivers_in_flight_outcome() {
        let mut initial = running(2);
        initial.current_recipient = Some("6281111111111".to_string());
        let (progress_tx, progress_rx) = watch::channel(initial);
        let (report_tx, report_rx) = watch::channel(None);

        let mut stream = Box::pin(progress_stream(progress_rx, report_rx));
        assert!(stream.next().await.is_some());

        // Cancelled while the first send is in flight
        progress_tx.send_modify(|p| p.status = SessionStatus::Cancelled);
        assert!(stream.next().await.is_some());

        // The in-flight send lands after the cancel
        progress_tx.send_modify(|p| p.record(0, true));
        assert!(stream.next().await.is_some());

        progress_tx.send_modify(|p| p.current_recipient = None);
        report_tx.send_replace(Some(SessionReport::new(SessionStatus::Cancelled, 2, Vec::new())));
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_idle_session_yields_single_event() {
        let (_progress_tx, progress_rx) = watch::channel(SessionProgress::idle());
        let (_report_tx, report_rx) = watch::channel(None);
        let events: Vec<_> = progress_stream(progress_rx, report_rx).collect().await;
        assert_eq!(events.len(), 1);
    }
}
