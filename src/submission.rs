use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc::UnboundedSender, Mutex};
use tokio_util::sync::CancellationToken;

use crate::clients::GradingService;
use crate::escalation::EscalationEngine;
use crate::models::Session;
use crate::proctor::ProctorEvent;

/// Initial attempt plus one automatic retry before surfacing a failure.
const SUBMIT_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionState {
    InProgress,
    Submitting,
    Submitted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTrigger {
    /// Candidate explicitly submitted.
    Manual,
    /// Countdown expired.
    Timeout,
    /// Escalation policy forced submission.
    Forced,
}

/// Gates the single exam-submission transition. All three trigger sources
/// funnel through `trigger`, and the check-and-transition on the state
/// happens under one lock with no await point in between, so two triggers
/// landing in the same event-loop turn still produce exactly one attempt.
pub struct SubmissionCoordinator {
    state: Mutex<SubmissionState>,
    session: Arc<Mutex<Session>>,
    escalation: Arc<Mutex<EscalationEngine>>,
    grading: Arc<dyn GradingService>,
    events: UnboundedSender<ProctorEvent>,
    cancel_token: CancellationToken,
}

impl SubmissionCoordinator {
    pub fn new(
        session: Arc<Mutex<Session>>,
        escalation: Arc<Mutex<EscalationEngine>>,
        grading: Arc<dyn GradingService>,
        events: UnboundedSender<ProctorEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            state: Mutex::new(SubmissionState::InProgress),
            session,
            escalation,
            grading,
            events,
            cancel_token,
        }
    }

    pub async fn state(&self) -> SubmissionState {
        *self.state.lock().await
    }

    /// Serialized entry point for all submission triggers. Returns the
    /// resulting state; a trigger against anything but `InProgress` is a
    /// logged no-op.
    pub async fn trigger(&self, trigger: SubmissionTrigger) -> Result<SubmissionState> {
        {
            let mut guard = self.state.lock().await;
            if *guard != SubmissionState::InProgress {
                info!(
                    "ignoring {:?} submission trigger in state {:?}",
                    trigger, *guard
                );
                return Ok(*guard);
            }
            *guard = SubmissionState::Submitting;
        }

        info!("submission accepted via {trigger:?} trigger");
        // The session is over the moment a trigger is accepted: stop the
        // signal sources and the countdown before the answers go out.
        self.cancel_token.cancel();
        self.emit_state(SubmissionState::Submitting);

        self.run_submit().await
    }

    /// Manual retry affordance after a surfaced failure.
    pub async fn retry(&self) -> Result<SubmissionState> {
        {
            let mut guard = self.state.lock().await;
            if *guard != SubmissionState::Failed {
                bail!("retry is only available after a failed submission");
            }
            *guard = SubmissionState::Submitting;
        }

        info!("retrying submission");
        self.emit_state(SubmissionState::Submitting);
        self.run_submit().await
    }

    async fn run_submit(&self) -> Result<SubmissionState> {
        let (session_id, answers) = {
            let session = self.session.lock().await;
            (session.id.clone(), session.answers.clone())
        };
        let violations = self.escalation.lock().await.violations().to_vec();

        let mut last_error: Option<anyhow::Error> = None;
        for attempt in 1..=SUBMIT_ATTEMPTS {
            match self
                .grading
                .submit(&session_id, &answers, &violations)
                .await
            {
                Ok(true) => {
                    info!("session {session_id} submitted ({} violations)", violations.len());
                    *self.state.lock().await = SubmissionState::Submitted;
                    self.emit_state(SubmissionState::Submitted);
                    return Ok(SubmissionState::Submitted);
                }
                Ok(false) => {
                    warn!("grading service rejected submission (attempt {attempt}/{SUBMIT_ATTEMPTS})");
                    last_error = Some(anyhow!("submission rejected by grading service"));
                }
                Err(err) => {
                    warn!("submission attempt {attempt}/{SUBMIT_ATTEMPTS} failed: {err:?}");
                    last_error = Some(err);
                }
            }
        }

        *self.state.lock().await = SubmissionState::Failed;
        self.emit_state(SubmissionState::Failed);
        let message = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "submission failed".to_string());
        let _ = self
            .events
            .send(ProctorEvent::SubmissionFailed { message });
        Ok(SubmissionState::Failed)
    }

    fn emit_state(&self, state: SubmissionState) {
        let _ = self
            .events
            .send(ProctorEvent::SubmissionStateChanged { state });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::AssessmentInfo;
    use crate::config::ProctorConfig;
    use crate::models::AnswerMap;
    use crate::models::AnomalyEvent;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct ScriptedGrader {
        calls: AtomicUsize,
        // Pre-programmed outcomes, oldest first; empty means accept.
        responses: std::sync::Mutex<VecDeque<Result<bool>>>,
    }

    impl ScriptedGrader {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: std::sync::Mutex::new(VecDeque::new()),
            })
        }

        fn scripted(responses: Vec<Result<bool>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: std::sync::Mutex::new(responses.into()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GradingService for ScriptedGrader {
        async fn submit(
            &self,
            _session_id: &str,
            _answers: &AnswerMap,
            _violations: &[AnomalyEvent],
        ) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(true))
        }
    }

    fn coordinator(
        grading: Arc<ScriptedGrader>,
    ) -> (Arc<SubmissionCoordinator>, mpsc::UnboundedReceiver<ProctorEvent>) {
        let info = AssessmentInfo {
            duration_secs: 60,
            question_ids: vec!["q1".into()],
        };
        let session = Arc::new(Mutex::new(Session::new("exam-1", &info)));
        let escalation = Arc::new(Mutex::new(EscalationEngine::new(
            &ProctorConfig::default(),
        )));
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(SubmissionCoordinator::new(
            session,
            escalation,
            grading,
            tx,
            CancellationToken::new(),
        ));
        (coordinator, rx)
    }

    #[tokio::test]
    async fn simultaneous_triggers_submit_exactly_once() {
        let grader = ScriptedGrader::accepting();
        let (coordinator, _rx) = coordinator(grader.clone());

        let (timeout, manual) = tokio::join!(
            coordinator.trigger(SubmissionTrigger::Timeout),
            coordinator.trigger(SubmissionTrigger::Manual),
        );

        assert_eq!(timeout.unwrap(), SubmissionState::Submitted);
        // The losing trigger observes whatever state the winner left behind.
        assert!(matches!(
            manual.unwrap(),
            SubmissionState::Submitting | SubmissionState::Submitted
        ));
        assert_eq!(grader.call_count(), 1);
        assert_eq!(coordinator.state().await, SubmissionState::Submitted);
    }

    #[tokio::test]
    async fn triggers_after_submission_are_noops() {
        let grader = ScriptedGrader::accepting();
        let (coordinator, _rx) = coordinator(grader.clone());

        coordinator.trigger(SubmissionTrigger::Manual).await.unwrap();
        let again = coordinator.trigger(SubmissionTrigger::Forced).await.unwrap();
        assert_eq!(again, SubmissionState::Submitted);
        assert_eq!(grader.call_count(), 1);
    }

    #[tokio::test]
    async fn transport_error_retries_once_automatically() {
        let grader =
            ScriptedGrader::scripted(vec![Err(anyhow!("connection reset")), Ok(true)]);
        let (coordinator, _rx) = coordinator(grader.clone());

        let state = coordinator.trigger(SubmissionTrigger::Manual).await.unwrap();
        assert_eq!(state, SubmissionState::Submitted);
        assert_eq!(grader.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_failure_then_manual_retry_recovers() {
        let grader = ScriptedGrader::scripted(vec![
            Err(anyhow!("gateway down")),
            Ok(false),
        ]);
        let (coordinator, mut rx) = coordinator(grader.clone());

        let state = coordinator.trigger(SubmissionTrigger::Timeout).await.unwrap();
        assert_eq!(state, SubmissionState::Failed);
        assert_eq!(grader.call_count(), 2);

        let mut saw_failure_event = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ProctorEvent::SubmissionFailed { .. }) {
                saw_failure_event = true;
            }
        }
        assert!(saw_failure_event);

        // Scripted responses are exhausted, so the grader accepts now.
        let state = coordinator.retry().await.unwrap();
        assert_eq!(state, SubmissionState::Submitted);
        assert_eq!(grader.call_count(), 3);
    }

    #[tokio::test]
    async fn retry_requires_a_failed_submission() {
        let grader = ScriptedGrader::accepting();
        let (coordinator, _rx) = coordinator(grader.clone());
        assert!(coordinator.retry().await.is_err());

        coordinator.trigger(SubmissionTrigger::Manual).await.unwrap();
        assert!(coordinator.retry().await.is_err());
    }
}
