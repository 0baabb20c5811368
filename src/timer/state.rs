use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Expired,
    Stopped,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

/// Result of applying one tick to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting; carries the new remaining value.
    Remaining(u32),
    /// This tick clamped the countdown to zero. Reported exactly once.
    Expired,
    /// Tick landed on a timer that is no longer running.
    Ignored,
}

/// The countdown is an explicit "ticks remaining" integer driven by a
/// monotonic tick source, never recomputed from wall-clock deltas, so a
/// suspended host can't make it over- or under-count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub total_secs: u32,
    pub remaining_secs: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            status: TimerStatus::Idle,
            total_secs: 0,
            remaining_secs: 0,
        }
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, total_secs: u32) {
        *self = Self {
            status: TimerStatus::Running,
            total_secs,
            remaining_secs: total_secs,
        };
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Ignored;
        }

        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.status = TimerStatus::Expired;
            TickOutcome::Expired
        } else {
            self.remaining_secs -= 1;
            TickOutcome::Remaining(self.remaining_secs)
        }
    }

    /// Manual stop. An expired timer stays expired; it can never restart.
    pub fn stop(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Stopped;
        }
    }
}
