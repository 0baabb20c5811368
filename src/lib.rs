mod classifier;
mod clients;
mod config;
mod escalation;
mod models;
mod proctor;
mod signals;
mod submission;
mod timer;
mod utils;

pub use classifier::AnomalyClassifier;
pub use clients::{
    AssessmentInfo, AssessmentSource, AuditLogSink, CameraFeed, Collaborators, GradingService,
    VisionClassifier,
};
pub use config::ProctorConfig;
pub use escalation::{EscalationEngine, EscalationOutcome, EscalationState};
pub use models::{AnomalyEvent, AnomalyKind, AnswerMap, RawSignal, Session};
pub use proctor::{ProctorController, ProctorEvent};
pub use signals::SignalController;
pub use submission::{SubmissionCoordinator, SubmissionState, SubmissionTrigger};
pub use timer::{TickOutcome, TimerController, TimerEvent, TimerState, TimerStatus};

/// Initialize logging for embedders that don't bring their own logger
/// (reads RUST_LOG env var). Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
