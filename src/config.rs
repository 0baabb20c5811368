/// Proctoring policy knobs with tunable thresholds.
#[derive(Debug, Clone)]
pub struct ProctorConfig {
    /// Warning count at which the escalation dialog opens (one-shot latch).
    pub warning_threshold: u32,

    /// Warning count at which submission is forced; `None` keeps the
    /// dialog-only behavior and never force-submits.
    pub forced_submit_threshold: Option<u32>,

    /// Period between camera frame captures.
    pub frame_period_ms: u64,

    /// Upper bound on a single frame capture before it is abandoned.
    pub capture_timeout_ms: u64,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 3,
            forced_submit_threshold: Some(6),
            frame_period_ms: 5_000,
            capture_timeout_ms: 10_000,
        }
    }
}
