use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clients::AssessmentInfo;

/// Per-question answers, keyed by question id. Every question gets a key at
/// session start; the value stays `None` until the candidate answers, so the
/// submission payload always covers the full question set in a stable order.
pub type AnswerMap = BTreeMap<String, Option<String>>;

/// One candidate's single attempt at one timed assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub assessment_id: String,
    pub question_ids: Vec<String>,
    pub answers: AnswerMap,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u32,
}

impl Session {
    pub fn new(assessment_id: &str, info: &AssessmentInfo) -> Self {
        let answers = info
            .question_ids
            .iter()
            .map(|question_id| (question_id.clone(), None))
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            assessment_id: assessment_id.to_string(),
            question_ids: info.question_ids.clone(),
            answers,
            started_at: Utc::now(),
            duration_secs: info.duration_secs,
        }
    }

    pub fn record_answer(&mut self, question_id: &str, choice: &str) -> Result<()> {
        match self.answers.get_mut(question_id) {
            Some(slot) => {
                *slot = Some(choice.to_string());
                Ok(())
            }
            None => bail!("unknown question id: {question_id}"),
        }
    }

    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> AssessmentInfo {
        AssessmentInfo {
            duration_secs: 600,
            question_ids: vec!["q1".into(), "q2".into(), "q3".into()],
        }
    }

    #[test]
    fn new_session_seeds_every_question_unanswered() {
        let session = Session::new("algebra-1", &sample_info());
        assert_eq!(session.answers.len(), 3);
        assert!(session.answers.values().all(|slot| slot.is_none()));
        assert_eq!(session.answered_count(), 0);
    }

    #[test]
    fn record_answer_rejects_unknown_question() {
        let mut session = Session::new("algebra-1", &sample_info());
        assert!(session.record_answer("q2", "B").is_ok());
        assert_eq!(session.answered_count(), 1);
        assert!(session.record_answer("q9", "A").is_err());
    }
}
