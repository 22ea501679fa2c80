//! A single dispatch session: state machine plus the sequential send loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use rand::Rng;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::gateway::{format_phone_number, GatewayError, GatewayResult, MessagePayload, MessageSender, SendResponse};
use crate::metrics::{MessageMetrics, SessionMetrics, TemplateMetrics};
use crate::recipient::Recipient;
use crate::template::{render, ChoiceSource, ThreadChoice};

use super::types::{
    DispatchConfig, DispatchError, DispatchResult, SendOutcome, SessionProgress, SessionReport,
    SessionStatus,
};

/// One run of the send loop across a recipient list.
///
/// Status and progress live in a watch channel: control calls change it
/// atomically and the loop reads it at its checkpoints (top of each
/// iteration, inside the pause wait, during pacing). A send already handed to
/// the sender always runs to completion.
pub struct DispatchSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: DispatchConfig,
    progress: watch::Sender<SessionProgress>,
    /// Append-only while the loop runs; cleared by `start` and `reset`
    outcomes: RwLock<Vec<SendOutcome>>,
    /// Published by the loop after its final status change
    report: watch::Sender<Option<SessionReport>>,
    choice: Mutex<Box<dyn ChoiceSource + Send>>,
}

impl DispatchSession {
    /// Create an idle session with random choice selection
    pub fn new(config: DispatchConfig) -> Self {
        Self::with_choice_source(config, Box::new(ThreadChoice))
    }

    /// Create an idle session with an injected choice source
    pub fn with_choice_source(config: DispatchConfig, choice: Box<dyn ChoiceSource + Send>) -> Self {
        let (progress, _) = watch::channel(SessionProgress::idle());
        let (report, _) = watch::channel(None);

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            config,
            progress,
            outcomes: RwLock::new(Vec::new()),
            report,
            choice: Mutex::new(choice),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> SessionStatus {
        self.progress.borrow().status
    }

    pub fn progress(&self) -> SessionProgress {
        self.progress.borrow().clone()
    }

    /// Watch progress changes
    pub fn subscribe(&self) -> watch::Receiver<SessionProgress> {
        self.progress.subscribe()
    }

    /// Watch for the final report; `None` until the loop stops
    pub fn subscribe_report(&self) -> watch::Receiver<Option<SessionReport>> {
        self.report.subscribe()
    }

    /// Outcomes recorded so far, in recipient order
    pub async fn outcomes(&self) -> Vec<SendOutcome> {
        self.outcomes.read().await.clone()
    }

    /// Final report, once the loop has stopped
    pub fn report(&self) -> Option<SessionReport> {
        self.report.borrow().clone()
    }

    /// Wait for the loop to stop and return its report.
    ///
    /// Returns `None` straight away for an idle session.
    pub async fn wait_finished(&self) -> Option<SessionReport> {
        let mut rx = self.subscribe_report();
        if self.status() == SessionStatus::Idle {
            return None;
        }
        let report = rx.wait_for(Option::is_some).await.ok()?.clone();
        report
    }

    /// Validate the request and spawn the send loop.
    ///
    /// The session must be idle. On error nothing changes.
    #[tracing::instrument(
        name = "dispatch.start",
        skip(self, template, recipients, sender),
        fields(session_id = %self.id, recipients = recipients.len())
    )]
    pub async fn start(
        self: &Arc<Self>,
        template: impl Into<String>,
        recipients: Vec<Recipient>,
        sender: Arc<dyn MessageSender>,
    ) -> DispatchResult<JoinHandle<SessionReport>> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(DispatchError::EmptyTemplate);
        }

        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients);
        }

        if recipients.len() > self.config.max_recipients {
            return Err(DispatchError::TooManyRecipients {
                count: recipients.len(),
                limit: self.config.max_recipients,
            });
        }

        let total = recipients.len();
        {
            let mut outcomes = self.outcomes.write().await;
            self.transition("start", &[SessionStatus::Idle], |progress| {
                *progress = SessionProgress {
                    status: SessionStatus::Running,
                    total,
                    ..SessionProgress::idle()
                };
            })?;
            outcomes.clear();
        }

        SessionMetrics::record_started();
        tracing::info!(session_id = %self.id, total = total, "Dispatch session started");

        let session = Arc::clone(self);
        Ok(tokio::spawn(async move {
            session.run(template, recipients, sender).await
        }))
    }

    /// Pause a running session before its next recipient
    pub fn pause(&self) -> DispatchResult<()> {
        self.transition("pause", &[SessionStatus::Running], |progress| {
            progress.status = SessionStatus::Paused;
        })?;
        tracing::info!(session_id = %self.id, "Dispatch session paused");
        Ok(())
    }

    /// Resume a paused session
    pub fn resume(&self) -> DispatchResult<()> {
        self.transition("resume", &[SessionStatus::Paused], |progress| {
            progress.status = SessionStatus::Running;
        })?;
        tracing::info!(session_id = %self.id, "Dispatch session resumed");
        Ok(())
    }

    /// Stop a running or paused session at its next checkpoint
    pub fn cancel(&self) -> DispatchResult<()> {
        self.transition(
            "cancel",
            &[SessionStatus::Running, SessionStatus::Paused],
            |progress| {
                progress.status = SessionStatus::Cancelled;
            },
        )?;
        tracing::info!(session_id = %self.id, "Dispatch session cancelled");
        Ok(())
    }

    /// Return a finished session to idle with an empty log.
    ///
    /// A cancelled loop may still be finishing its last send; reset waits
    /// until that loop has published its report.
    pub async fn reset(&self) -> DispatchResult<()> {
        self.wait_loop_stopped().await?;

        let mut outcomes = self.outcomes.write().await;

        self.transition(
            "reset",
            &[SessionStatus::Completed, SessionStatus::Cancelled],
            |progress| {
                *progress = SessionProgress::idle();
            },
        )?;

        outcomes.clear();
        self.report.send_replace(None);
        tracing::debug!(session_id = %self.id, "Dispatch session reset");
        Ok(())
    }

    /// Wait for the report of a terminal session. Fails as soon as the
    /// session is no longer terminal (a concurrent reset won).
    async fn wait_loop_stopped(&self) -> DispatchResult<()> {
        let mut report_rx = self.report.subscribe();
        let mut progress_rx = self.subscribe();

        loop {
            if report_rx.borrow_and_update().is_some() {
                return Ok(());
            }

            let status = progress_rx.borrow_and_update().status;
            if !status.is_terminal() {
                return Err(DispatchError::InvalidTransition {
                    action: "reset",
                    status,
                });
            }

            tracing::debug!(session_id = %self.id, "Waiting for the send loop to stop before reset");
            tokio::select! {
                _ = report_rx.changed() => {}
                _ = progress_rx.changed() => {}
            }
        }
    }

    /// Apply `apply` only if the current status is in `allowed`
    fn transition(
        &self,
        action: &'static str,
        allowed: &[SessionStatus],
        apply: impl FnOnce(&mut SessionProgress),
    ) -> DispatchResult<()> {
        let mut result = Ok(());

        self.progress.send_if_modified(|progress| {
            if allowed.contains(&progress.status) {
                apply(progress);
                true
            } else {
                result = Err(DispatchError::InvalidTransition {
                    action,
                    status: progress.status,
                });
                false
            }
        });

        result
    }

    #[tracing::instrument(
        name = "dispatch.run",
        skip_all,
        fields(session_id = %self.id, total = recipients.len())
    )]
    async fn run(
        self: Arc<Self>,
        template: String,
        recipients: Vec<Recipient>,
        sender: Arc<dyn MessageSender>,
    ) -> SessionReport {
        let total = recipients.len();
        let mut status_rx = self.subscribe();

        for (index, recipient) in recipients.iter().enumerate() {
            if !self.wait_until_runnable(&mut status_rx).await {
                tracing::info!(
                    session_id = %self.id,
                    index = index,
                    "Cancellation observed, skipping remaining recipients"
                );
                break;
            }

            self.progress.send_modify(|progress| {
                progress.current_index = index;
                progress.current_recipient = Some(recipient.label().to_string());
            });

            let outcome = self.dispatch_one(&template, recipient, sender.as_ref()).await;
            let success = outcome.success;
            self.outcomes.write().await.push(outcome);
            self.progress.send_modify(|progress| progress.record(index, success));

            tracing::debug!(
                session_id = %self.id,
                index = index,
                success = success,
                "Recipient processed"
            );

            if index + 1 < total {
                self.pace(&mut status_rx).await;
            }
        }

        self.finish(total).await
    }

    /// Block while paused. Returns `false` once the session is cancelled.
    async fn wait_until_runnable(&self, rx: &mut watch::Receiver<SessionProgress>) -> bool {
        loop {
            let status = rx.borrow_and_update().status;
            match status {
                SessionStatus::Running => return true,
                SessionStatus::Paused => {
                    let _ = tokio::time::timeout(self.config.pause_poll_interval, rx.changed()).await;
                }
                _ => return false,
            }
        }
    }

    /// Courtesy delay between sends; ends early on cancellation
    async fn pace(&self, rx: &mut watch::Receiver<SessionProgress>) {
        let delay = self.pacing_delay();

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_for_cancel(rx) => {}
        }
    }

    fn pacing_delay(&self) -> Duration {
        let min = self.config.pacing_min.as_millis() as u64;
        let max = self.config.pacing_max.as_millis() as u64;
        if max <= min {
            return self.config.pacing_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    async fn dispatch_one(
        &self,
        template: &str,
        recipient: &Recipient,
        sender: &dyn MessageSender,
    ) -> SendOutcome {
        let rendered = {
            let mut choice = self.choice.lock().unwrap_or_else(PoisonError::into_inner);
            render(template, &recipient.bindings(), choice.as_mut())
        };
        TemplateMetrics::record_rendered();

        let payload = MessagePayload::new(
            format_phone_number(&recipient.address),
            rendered.text.clone(),
            self.config.message_ttl_seconds,
        );

        let started = Instant::now();
        match self.invoke(sender, &payload).await {
            Ok(response) => {
                if response.success {
                    MessageMetrics::record_success(started.elapsed());
                } else {
                    MessageMetrics::record_failure(started.elapsed());
                }
                SendOutcome::from_response(recipient.clone(), rendered.text, response)
            }
            Err(e) => {
                MessageMetrics::record_fault();
                tracing::warn!(
                    session_id = %self.id,
                    phone = %payload.phone,
                    error = %e,
                    "Send faulted, continuing with next recipient"
                );
                SendOutcome::fault(recipient.clone(), rendered.text, e)
            }
        }
    }

    /// Call the sender, converting panics and timeouts into errors
    async fn invoke(
        &self,
        sender: &dyn MessageSender,
        payload: &MessagePayload,
    ) -> GatewayResult<SendResponse> {
        let call = AssertUnwindSafe(sender.send(payload)).catch_unwind();

        let result = match self.config.send_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(GatewayError::Timeout(limit)),
            },
            None => call.await,
        };

        result.unwrap_or_else(|panic| Err(GatewayError::Fault(panic_message(panic.as_ref()))))
    }

    async fn finish(&self, total: usize) -> SessionReport {
        // Held until the report is published so `reset` cannot interleave
        let outcomes = self.outcomes.read().await;

        let mut status = SessionStatus::Completed;
        self.progress.send_modify(|progress| {
            if progress.status == SessionStatus::Cancelled {
                status = SessionStatus::Cancelled;
            } else {
                progress.status = SessionStatus::Completed;
            }
            progress.current_recipient = None;
        });

        let final_report = SessionReport::new(status, total, outcomes.clone());
        self.report.send_replace(Some(final_report.clone()));

        SessionMetrics::record_finished(status.as_str());
        tracing::info!(
            session_id = %self.id,
            status = %status,
            processed = final_report.outcomes.len(),
            succeeded = final_report.succeeded,
            failed = final_report.failed,
            "Dispatch session finished"
        );

        final_report
    }
}

async fn wait_for_cancel(rx: &mut watch::Receiver<SessionProgress>) {
    let _ = rx.wait_for(|p| p.status == SessionStatus::Cancelled).await;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("sender panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("sender panicked: {}", message)
    } else {
        "sender panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockSender;

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            pacing_min: Duration::from_millis(1),
            pacing_max: Duration::from_millis(2),
            pause_poll_interval: Duration::from_millis(5),
            ..DispatchConfig::default()
        }
    }

    fn sender() -> Arc<dyn MessageSender> {
        Arc::new(MockSender::new())
    }

    #[tokio::test]
    async fn test_start_rejects_blank_template() {
        let session = Arc::new(DispatchSession::new(fast_config()));
        let result = session
            .start("   \n", vec![Recipient::number("6281234567890")], sender())
            .await;

        assert_eq!(result.err(), Some(DispatchError::EmptyTemplate));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_start_rejects_empty_recipients() {
        let session = Arc::new(DispatchSession::new(fast_config()));
        let result = session.start("Hi", Vec::new(), sender()).await;

        assert_eq!(result.err(), Some(DispatchError::NoRecipients));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_start_enforces_recipient_limit() {
        let config = DispatchConfig {
            max_recipients: 1,
            ..fast_config()
        };
        let session = Arc::new(DispatchSession::new(config));
        let recipients = vec![Recipient::number("1111111111"), Recipient::number("2222222222")];

        let result = session.start("Hi", recipients, sender()).await;
        assert_eq!(
            result.err(),
            Some(DispatchError::TooManyRecipients { count: 2, limit: 1 })
        );
    }

    #[tokio::test]
    async fn test_controls_rejected_when_idle() {
        let session = DispatchSession::new(fast_config());

        assert!(matches!(
            session.pause(),
            Err(DispatchError::InvalidTransition { action: "pause", status: SessionStatus::Idle })
        ));
        assert!(session.resume().is_err());
        assert!(session.cancel().is_err());
        assert!(session.reset().await.is_err());
        assert!(session.wait_finished().await.is_none());
    }

    #[tokio::test]
    async fn test_completes_and_resets() {
        let session = Arc::new(DispatchSession::new(fast_config()));
        let handle = session
            .start("Hi", vec![Recipient::number("6281234567890")], sender())
            .await
            .unwrap();

        let report = handle.await.unwrap();
        assert_eq!(report.status, SessionStatus::Completed);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(session.status(), SessionStatus::Completed);

        // Terminal until reset
        assert!(session.start("Hi", vec![Recipient::number("6281234567890")], sender()).await.is_err());
        assert!(session.resume().is_err());

        session.reset().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.outcomes().await.is_empty());
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_resets_after_cancel() {
        let session = Arc::new(DispatchSession::new(fast_config()));
        let slow: Arc<dyn MessageSender> = Arc::new(MockSender::with_latency(Duration::from_millis(100)));
        let recipients = vec![Recipient::number("6281111111111"), Recipient::number("6282222222222")];
        let handle = session.start("Hi", recipients, slow).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        session.cancel().unwrap();

        // Both wait for the in-flight send; exactly one performs the reset
        let (first, second) = tokio::join!(session.reset(), session.reset());
        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(DispatchError::InvalidTransition { action: "reset", status: SessionStatus::Idle })
        )));

        let report = handle.await.unwrap();
        assert_eq!(report.status, SessionStatus::Cancelled);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.outcomes().await.is_empty());
    }

    #[test]
    fn test_pacing_delay_within_window() {
        let config = DispatchConfig {
            pacing_min: Duration::from_millis(1000),
            pacing_max: Duration::from_millis(2000),
            ..DispatchConfig::default()
        };
        let session = DispatchSession::new(config);
        for _ in 0..100 {
            let delay = session.pacing_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "sender panicked: boom");
    }
}
