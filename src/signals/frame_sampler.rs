use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clients::CameraFeed;
use crate::models::RawSignal;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Periodic camera sampling for one session. A missing camera makes the
/// source inert after a single warning; per-capture errors and timeouts are
/// logged and skipped so a flaky camera never interrupts the exam.
pub(super) async fn sampling_loop(
    session_id: String,
    camera: Arc<dyn CameraFeed>,
    frame_period: Duration,
    capture_timeout: Duration,
    out: UnboundedSender<RawSignal>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(frame_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick; the first frame lands one period in.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match tokio::time::timeout(capture_timeout, camera.capture_frame()).await {
                    Ok(Ok(Some(png))) => {
                        if out.send(RawSignal::FrameCaptured { png }).is_err() {
                            break;
                        }
                    }
                    Ok(Ok(None)) => {
                        log_warn!("no camera available for session {session_id}; frame sampling disabled");
                        break;
                    }
                    Ok(Err(err)) => {
                        log_warn!("frame capture failed for session {session_id}: {err:?}");
                    }
                    Err(_) => {
                        log_warn!(
                            "frame capture timeout (> {}ms) session {session_id}",
                            capture_timeout.as_millis()
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("frame sampler shutting down");
                break;
            }
        }
    }
}
