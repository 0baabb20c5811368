use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use log::info;
use tokio::{
    sync::{mpsc::UnboundedSender, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::state::{TickOutcome, TimerState, TimerStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining_secs: u32 },
    Expired,
}

/// Single countdown per session. The ticker is a tokio interval (monotonic
/// clock); expiry is emitted exactly once, after which the ticker stops and
/// the timer can never be restarted.
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub async fn state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn start(
        &self,
        total_secs: u32,
        events: UnboundedSender<TimerEvent>,
        cancel_token: CancellationToken,
    ) -> Result<()> {
        if total_secs == 0 {
            return Err(anyhow!("total_secs must be greater than zero"));
        }

        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Idle {
                return Err(anyhow!("timer already active"));
            }
            state.begin(total_secs);
        }

        info!("countdown started: {total_secs}s");
        self.spawn_ticker(events, cancel_token).await;
        Ok(())
    }

    /// Stops ticking without expiring. Idempotent; safe on an already
    /// expired or stopped timer.
    pub async fn stop(&self) {
        self.state.lock().await.stop();
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn spawn_ticker(
        &self,
        events: UnboundedSender<TimerEvent>,
        cancel_token: CancellationToken,
    ) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; consume it so
            // the loop below sees one tick per second of exam time.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let outcome = { state.lock().await.tick() };
                        match outcome {
                            TickOutcome::Remaining(remaining_secs) => {
                                let _ = events.send(TimerEvent::Tick { remaining_secs });
                            }
                            TickOutcome::Expired => {
                                info!("countdown expired");
                                let _ = events.send(TimerEvent::Expired);
                                break;
                            }
                            TickOutcome::Ignored => break,
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        state.lock().await.stop();
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }
}
