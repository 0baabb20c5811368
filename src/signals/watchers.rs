//! The focus, pointer, and keystroke watchers. Each watcher is a
//! self-contained translator with no knowledge of the others or of the
//! classifier's policy: it turns one host notification into one
//! `RawSignal`. A single dispatch loop drives them in notification order,
//! so signals of different kinds are never reordered on the way to the
//! classifier.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::models::RawSignal;

/// Platform-level notifications pushed in by the hosting view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNotification {
    FocusChanged { visible: bool },
    PointerExit,
    PointerEntry,
    KeyPress,
}

/// Forwards every visibility transition, no debouncing.
struct FocusWatcher;

impl FocusWatcher {
    fn observe(&mut self, visible: bool) -> RawSignal {
        RawSignal::FocusChanged { visible }
    }
}

struct PointerWatcher;

impl PointerWatcher {
    fn observe_exit(&mut self) -> RawSignal {
        RawSignal::PointerLeft
    }

    fn observe_entry(&mut self) -> RawSignal {
        RawSignal::PointerEntered
    }
}

/// Owns "time of last press" privately. The anchor is seeded when the
/// source starts, so the first press yields an interval measured from
/// session start.
struct KeystrokeWatcher {
    last_press: Instant,
}

impl KeystrokeWatcher {
    fn new() -> Self {
        Self {
            last_press: Instant::now(),
        }
    }

    fn observe(&mut self) -> RawSignal {
        let now = Instant::now();
        let ms = now.duration_since(self.last_press).as_millis() as u64;
        self.last_press = now;
        RawSignal::KeyInterval { ms }
    }
}

pub(super) async fn host_watch_loop(
    mut notifications: UnboundedReceiver<HostNotification>,
    out: UnboundedSender<RawSignal>,
    cancel_token: CancellationToken,
) {
    let mut focus = FocusWatcher;
    let mut pointer = PointerWatcher;
    let mut keystrokes = KeystrokeWatcher::new();

    loop {
        tokio::select! {
            maybe = notifications.recv() => match maybe {
                Some(notification) => {
                    let signal = match notification {
                        HostNotification::FocusChanged { visible } => focus.observe(visible),
                        HostNotification::PointerExit => pointer.observe_exit(),
                        HostNotification::PointerEntry => pointer.observe_entry(),
                        HostNotification::KeyPress => keystrokes.observe(),
                    };
                    if out.send(signal).is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = cancel_token.cancelled() => break,
        }
    }
}
