//! Contracts for the external collaborators the proctor core depends on.
//!
//! The core never owns quiz content, grading, or vision analysis; it talks
//! to them through these traits so a hosting application (or a test) can
//! plug in transport-specific implementations.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AnomalyEvent, AnswerMap};

/// What the core needs to know about an assessment before a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentInfo {
    pub duration_secs: u32,
    pub question_ids: Vec<String>,
}

/// Loads assessment metadata. A failure here means the session never
/// starts and the timer never runs.
#[async_trait]
pub trait AssessmentSource: Send + Sync {
    async fn fetch_assessment(&self, assessment_id: &str) -> Result<AssessmentInfo>;
}

/// Best-effort audit trail. Invoked fire-and-forget; failures are logged
/// locally and never block exam progress.
#[async_trait]
pub trait AuditLogSink: Send + Sync {
    async fn record_event(
        &self,
        session_id: &str,
        kind: &str,
        details: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
}

/// External suspicious-behavior detector for camera frames. Failures are
/// treated as "not suspicious" (fail-open).
#[async_trait]
pub trait VisionClassifier: Send + Sync {
    /// Returns `true` when the frame looks suspicious.
    async fn analyze_frame(&self, png: &[u8]) -> Result<bool>;
}

/// The sole writer of final results; consumed only by the submission
/// coordinator. Returns whether the submission was accepted.
#[async_trait]
pub trait GradingService: Send + Sync {
    async fn submit(
        &self,
        session_id: &str,
        answers: &AnswerMap,
        violations: &[AnomalyEvent],
    ) -> Result<bool>;
}

/// Camera access for the frame sampler. `Ok(None)` means no camera is
/// available and the sampler goes inert for the rest of the session.
#[async_trait]
pub trait CameraFeed: Send + Sync {
    async fn capture_frame(&self) -> Result<Option<Vec<u8>>>;
}

/// Bundle of collaborator handles passed to the proctor controller.
#[derive(Clone)]
pub struct Collaborators {
    pub assessment: Arc<dyn AssessmentSource>,
    pub audit: Arc<dyn AuditLogSink>,
    pub vision: Arc<dyn VisionClassifier>,
    pub grading: Arc<dyn GradingService>,
    pub camera: Arc<dyn CameraFeed>,
}
