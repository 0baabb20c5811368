use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;

use crate::clients::VisionClassifier;
use crate::models::{AnomalyEvent, AnomalyKind, RawSignal};

/// Every key interval joins a sliding window of this many samples.
const KEY_WINDOW_SIZE: usize = 10;
/// A window sample deviating from the window mean by more than this flags
/// an irregular typing pattern.
const KEY_DEVIATION_MS: f64 = 1000.0;
/// Pointer exits are only suspicious on every nth occurrence.
const POINTER_EXIT_PERIOD: u32 = 3;

/// Turns raw signals into anomaly verdicts. Stateless across calls except
/// for the pointer-exit counter and the key-interval window, both scoped to
/// one session (a fresh classifier is built per session, never shared).
pub struct AnomalyClassifier {
    vision: Arc<dyn VisionClassifier>,
    pointer_exits: u32,
    key_intervals: VecDeque<u64>,
}

impl AnomalyClassifier {
    pub fn new(vision: Arc<dyn VisionClassifier>) -> Self {
        Self {
            vision,
            pointer_exits: 0,
            key_intervals: VecDeque::with_capacity(KEY_WINDOW_SIZE),
        }
    }

    /// Classify one signal into zero-or-one anomalies.
    pub async fn classify(&mut self, signal: RawSignal) -> Option<AnomalyEvent> {
        match signal {
            RawSignal::FocusChanged { visible } => {
                (!visible).then(|| AnomalyEvent::now(AnomalyKind::TabSwitch))
            }
            RawSignal::PointerEntered => None,
            RawSignal::PointerLeft => {
                self.pointer_exits += 1;
                (self.pointer_exits % POINTER_EXIT_PERIOD == 0)
                    .then(|| AnomalyEvent::now(AnomalyKind::PointerSuspicious))
            }
            RawSignal::KeyInterval { ms } => self.classify_key_interval(ms),
            RawSignal::FrameCaptured { png } => match self.vision.analyze_frame(&png).await {
                Ok(true) => Some(AnomalyEvent::now(AnomalyKind::VisionSuspicious)),
                Ok(false) => None,
                Err(err) => {
                    // Fail-open: an unreachable classifier must not block the exam.
                    warn!("vision classifier unavailable, treating frame as clean: {err:?}");
                    None
                }
            },
        }
    }

    fn classify_key_interval(&mut self, ms: u64) -> Option<AnomalyEvent> {
        if self.key_intervals.len() == KEY_WINDOW_SIZE {
            self.key_intervals.pop_front();
        }
        self.key_intervals.push_back(ms);

        if self.key_intervals.len() < KEY_WINDOW_SIZE {
            return None;
        }

        let mean = self.key_intervals.iter().sum::<u64>() as f64 / KEY_WINDOW_SIZE as f64;
        let irregular = self
            .key_intervals
            .iter()
            .any(|&interval| (interval as f64 - mean).abs() > KEY_DEVIATION_MS);

        irregular.then(|| AnomalyEvent::now(AnomalyKind::KeystrokeIrregular))
    }
}
