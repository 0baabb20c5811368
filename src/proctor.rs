use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    Mutex,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::classifier::AnomalyClassifier;
use crate::clients::{AuditLogSink, Collaborators};
use crate::config::ProctorConfig;
use crate::escalation::{EscalationEngine, EscalationState};
use crate::models::{AnomalyEvent, RawSignal, Session};
use crate::signals::SignalController;
use crate::submission::{SubmissionCoordinator, SubmissionState, SubmissionTrigger};
use crate::timer::{TimerController, TimerEvent, TimerState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Candidate-visible event stream: countdown display, warning banner,
/// escalation dialog, submission progress.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ProctorEvent {
    TimerTick { remaining_secs: u32 },
    TimerExpired,
    WarningIssued { message: String, warning_count: u32 },
    WarningDialogOpened,
    SubmissionStateChanged { state: SubmissionState },
    SubmissionFailed { message: String },
}

struct ActiveSession {
    session: Arc<Mutex<Session>>,
    escalation: Arc<Mutex<EscalationEngine>>,
    coordinator: Arc<SubmissionCoordinator>,
    signals: SignalController,
    timer: TimerController,
    cancel_token: CancellationToken,
    pipeline: Option<JoinHandle<()>>,
    timer_forward: Option<JoinHandle<()>>,
}

/// Owns the lifetime of one proctored session: mounts the signal sources,
/// the classifier pipeline, and the countdown; funnels all three submission
/// triggers into the coordinator; and tears everything down unconditionally
/// on every exit path so no listener or ticker leaks across sessions.
pub struct ProctorController {
    config: ProctorConfig,
    clients: Collaborators,
    events: UnboundedSender<ProctorEvent>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl ProctorController {
    pub fn new(
        config: ProctorConfig,
        clients: Collaborators,
    ) -> (Self, UnboundedReceiver<ProctorEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                clients,
                events,
                active: Arc::new(Mutex::new(None)),
            },
            events_rx,
        )
    }

    /// Loads the assessment and mounts a fresh session. If the assessment
    /// can't be loaded, nothing starts -- in particular the timer.
    pub async fn start_session(&self, assessment_id: &str) -> Result<Session> {
        let mut active_guard = self.active.lock().await;
        if let Some(active) = active_guard.as_ref() {
            if active.coordinator.state().await != SubmissionState::Submitted {
                bail!("a session is already active");
            }
        }

        let info = self
            .clients
            .assessment
            .fetch_assessment(assessment_id)
            .await
            .with_context(|| format!("failed to load assessment {assessment_id}"))?;
        if info.duration_secs == 0 {
            bail!("assessment duration must be greater than zero");
        }

        let session = Session::new(assessment_id, &info);
        log_info!(
            "starting proctored session {} for assessment {} ({} questions, {}s)",
            session.id,
            assessment_id,
            session.question_ids.len(),
            info.duration_secs
        );

        let cancel_token = CancellationToken::new();
        let mut signals = SignalController::new();
        let signal_rx = signals
            .start_signals(
                session.id.clone(),
                Arc::clone(&self.clients.camera),
                &self.config,
                cancel_token.clone(),
            )
            .await?;

        let session_arc = Arc::new(Mutex::new(session.clone()));
        let escalation = Arc::new(Mutex::new(EscalationEngine::new(&self.config)));
        let coordinator = Arc::new(SubmissionCoordinator::new(
            Arc::clone(&session_arc),
            Arc::clone(&escalation),
            Arc::clone(&self.clients.grading),
            self.events.clone(),
            cancel_token.clone(),
        ));

        let classifier = AnomalyClassifier::new(Arc::clone(&self.clients.vision));
        let pipeline = tokio::spawn(pipeline_loop(
            session.id.clone(),
            signal_rx,
            classifier,
            Arc::clone(&escalation),
            Arc::clone(&coordinator),
            Arc::clone(&self.clients.audit),
            self.events.clone(),
            cancel_token.clone(),
        ));

        let timer = TimerController::new();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        if let Err(err) = timer
            .start(info.duration_secs, timer_tx, cancel_token.clone())
            .await
        {
            // Unwind the already-started sources before surfacing the error.
            cancel_token.cancel();
            let _ = signals.stop_signals().await;
            return Err(err);
        }
        let timer_forward = tokio::spawn(timer_forward_loop(
            timer_rx,
            Arc::clone(&coordinator),
            self.events.clone(),
        ));

        *active_guard = Some(ActiveSession {
            session: session_arc,
            escalation,
            coordinator,
            signals,
            timer,
            cancel_token,
            pipeline: Some(pipeline),
            timer_forward: Some(timer_forward),
        });

        Ok(session)
    }

    pub async fn record_answer(&self, question_id: &str, choice: &str) -> Result<()> {
        let guard = self.active.lock().await;
        let active = guard
            .as_ref()
            .ok_or_else(|| anyhow!("no active session"))?;
        if active.coordinator.state().await != SubmissionState::InProgress {
            bail!("answers are locked once submission has started");
        }
        let session = Arc::clone(&active.session);
        drop(guard);
        let result = session.lock().await.record_answer(question_id, choice);
        result
    }

    /// Manual submission from the candidate.
    pub async fn submit_answers(&self) -> Result<SubmissionState> {
        let coordinator = self.coordinator().await?;
        coordinator.trigger(SubmissionTrigger::Manual).await
    }

    /// Manual retry after a surfaced submission failure.
    pub async fn retry_submission(&self) -> Result<SubmissionState> {
        let coordinator = self.coordinator().await?;
        coordinator.retry().await
    }

    /// Candidate acknowledged the escalation notice. Clears the dialog
    /// flag only; the warning count stands.
    pub async fn acknowledge_warning(&self) -> Result<()> {
        let guard = self.active.lock().await;
        let active = guard
            .as_ref()
            .ok_or_else(|| anyhow!("no active session"))?;
        active.escalation.lock().await.acknowledge_dialog();
        Ok(())
    }

    pub async fn report_focus_changed(&self, visible: bool) {
        if let Some(active) = &*self.active.lock().await {
            active.signals.report_focus_changed(visible);
        }
    }

    pub async fn report_pointer_exit(&self) {
        if let Some(active) = &*self.active.lock().await {
            active.signals.report_pointer_exit();
        }
    }

    pub async fn report_pointer_entry(&self) {
        if let Some(active) = &*self.active.lock().await {
            active.signals.report_pointer_entry();
        }
    }

    pub async fn report_key_press(&self) {
        if let Some(active) = &*self.active.lock().await {
            active.signals.report_key_press();
        }
    }

    pub async fn session_snapshot(&self) -> Option<Session> {
        match &*self.active.lock().await {
            Some(active) => Some(active.session.lock().await.clone()),
            None => None,
        }
    }

    pub async fn escalation_state(&self) -> Option<EscalationState> {
        match &*self.active.lock().await {
            Some(active) => Some(active.escalation.lock().await.state()),
            None => None,
        }
    }

    pub async fn violation_log(&self) -> Vec<AnomalyEvent> {
        match &*self.active.lock().await {
            Some(active) => active.escalation.lock().await.violations().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn timer_state(&self) -> Option<TimerState> {
        match &*self.active.lock().await {
            Some(active) => Some(active.timer.state().await),
            None => None,
        }
    }

    pub async fn submission_state(&self) -> Option<SubmissionState> {
        match &*self.active.lock().await {
            Some(active) => Some(active.coordinator.state().await),
            None => None,
        }
    }

    /// Unconditional teardown: cancels every source, stops the ticker, and
    /// joins the worker tasks. Used on abandonment and by hosts unmounting
    /// the exam view; safe to call with no session active.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(mut active) = self.active.lock().await.take() else {
            return Ok(());
        };
        log_info!("shutting down proctor session");

        active.cancel_token.cancel();
        active.timer.stop().await;
        active.signals.stop_signals().await?;
        if let Some(handle) = active.pipeline.take() {
            handle.await.context("signal pipeline task failed to join")?;
        }
        if let Some(handle) = active.timer_forward.take() {
            handle
                .await
                .context("timer forwarding task failed to join")?;
        }
        Ok(())
    }

    async fn coordinator(&self) -> Result<Arc<SubmissionCoordinator>> {
        let guard = self.active.lock().await;
        guard
            .as_ref()
            .map(|active| Arc::clone(&active.coordinator))
            .ok_or_else(|| anyhow!("no active session"))
    }
}

/// Fan-in pipeline: raw signals in observation order -> classifier ->
/// escalation engine, with a fire-and-forget audit write per anomaly.
#[allow(clippy::too_many_arguments)]
async fn pipeline_loop(
    session_id: String,
    mut signals: UnboundedReceiver<RawSignal>,
    mut classifier: AnomalyClassifier,
    escalation: Arc<Mutex<EscalationEngine>>,
    coordinator: Arc<SubmissionCoordinator>,
    audit: Arc<dyn AuditLogSink>,
    events: UnboundedSender<ProctorEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let signal = tokio::select! {
            maybe = signals.recv() => match maybe {
                Some(signal) => signal,
                None => break,
            },
            _ = cancel_token.cancelled() => break,
        };

        let Some(anomaly) = classifier.classify(signal).await else {
            continue;
        };
        log_info!(
            "anomaly for session {session_id}: {} ({})",
            anomaly.kind.wire_name(),
            anomaly.message
        );

        // Best-effort audit write; never blocks signal processing.
        {
            let audit = Arc::clone(&audit);
            let session_id = session_id.clone();
            let anomaly = anomaly.clone();
            tokio::spawn(async move {
                let details = serde_json::json!({ "message": anomaly.message });
                if let Err(err) = audit
                    .record_event(
                        &session_id,
                        anomaly.kind.wire_name(),
                        details,
                        anomaly.timestamp,
                    )
                    .await
                {
                    log_warn!("audit log write failed for session {session_id}: {err:?}");
                }
            });
        }

        let outcome = escalation.lock().await.record(anomaly.clone());
        let _ = events.send(ProctorEvent::WarningIssued {
            message: anomaly.message,
            warning_count: outcome.state.warning_count,
        });
        if outcome.dialog_just_opened {
            let _ = events.send(ProctorEvent::WarningDialogOpened);
        }
        if outcome.force_submit {
            log_warn!("violation limit reached for session {session_id}; forcing submission");
            if let Err(err) = coordinator.trigger(SubmissionTrigger::Forced).await {
                log_error!("forced submission failed for session {session_id}: {err:?}");
            }
        }
    }
    log_info!("signal pipeline for session {session_id} stopped");
}

/// Relays countdown ticks to the candidate display and converts expiry into
/// the timeout submission trigger.
async fn timer_forward_loop(
    mut timer_events: UnboundedReceiver<TimerEvent>,
    coordinator: Arc<SubmissionCoordinator>,
    events: UnboundedSender<ProctorEvent>,
) {
    while let Some(event) = timer_events.recv().await {
        match event {
            TimerEvent::Tick { remaining_secs } => {
                let _ = events.send(ProctorEvent::TimerTick { remaining_secs });
            }
            TimerEvent::Expired => {
                let _ = events.send(ProctorEvent::TimerExpired);
                if let Err(err) = coordinator.trigger(SubmissionTrigger::Timeout).await {
                    log_error!("timeout submission failed: {err:?}");
                }
                break;
            }
        }
    }
}
