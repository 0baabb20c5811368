use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ProctorConfig;
use crate::models::AnomalyEvent;

/// Candidate-visible escalation snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EscalationState {
    pub warning_count: u32,
    pub dialog_open: bool,
}

/// What a single `record` call changed, for the orchestrator to act on.
#[derive(Debug, Clone, Copy)]
pub struct EscalationOutcome {
    pub state: EscalationState,
    /// True only on the call that crossed the warning threshold.
    pub dialog_just_opened: bool,
    /// True only on the call that crossed the forced-submit threshold.
    pub force_submit: bool,
}

/// Owns the warning count and the violation log for one session. The count
/// is monotonically non-decreasing; the dialog is a one-shot latch that
/// opens on the first threshold crossing and never re-arms. Acknowledging
/// clears `dialog_open` only, never the count.
pub struct EscalationEngine {
    warning_threshold: u32,
    forced_submit_threshold: Option<u32>,
    warning_count: u32,
    dialog_open: bool,
    dialog_shown: bool,
    force_fired: bool,
    violations: Vec<AnomalyEvent>,
}

impl EscalationEngine {
    pub fn new(config: &ProctorConfig) -> Self {
        Self {
            warning_threshold: config.warning_threshold,
            forced_submit_threshold: config.forced_submit_threshold,
            warning_count: 0,
            dialog_open: false,
            dialog_shown: false,
            force_fired: false,
            violations: Vec::new(),
        }
    }

    pub fn record(&mut self, anomaly: AnomalyEvent) -> EscalationOutcome {
        info!(
            "violation recorded: {} ({})",
            anomaly.kind.wire_name(),
            anomaly.message
        );
        self.violations.push(anomaly);
        self.warning_count += 1;

        let mut dialog_just_opened = false;
        if !self.dialog_shown && self.warning_count >= self.warning_threshold {
            self.dialog_shown = true;
            self.dialog_open = true;
            dialog_just_opened = true;
        }

        let force_submit = match self.forced_submit_threshold {
            Some(limit) if !self.force_fired && self.warning_count >= limit => {
                warn!("warning count reached forced-submit limit ({limit})");
                self.force_fired = true;
                true
            }
            _ => false,
        };

        EscalationOutcome {
            state: self.state(),
            dialog_just_opened,
            force_submit,
        }
    }

    /// Clears the dialog flag after the candidate acknowledges the notice.
    /// The warning count is untouched.
    pub fn acknowledge_dialog(&mut self) {
        self.dialog_open = false;
    }

    pub fn state(&self) -> EscalationState {
        EscalationState {
            warning_count: self.warning_count,
            dialog_open: self.dialog_open,
        }
    }

    pub fn violations(&self) -> &[AnomalyEvent] {
        &self.violations
    }
}
