use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::clients::CameraFeed;
use crate::config::ProctorConfig;
use crate::models::RawSignal;

use super::frame_sampler::sampling_loop;
use super::watchers::{host_watch_loop, HostNotification};

/// Starts and tears down the signal sources for one session: the host-event
/// watchers (focus, pointer, keystroke) and the periodic frame sampler.
/// Everything fans into a single `RawSignal` channel the pipeline consumes,
/// so the escalation engine sees anomalies in observation order.
pub struct SignalController {
    notifications: Option<UnboundedSender<HostNotification>>,
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SignalController {
    pub fn new() -> Self {
        Self {
            notifications: None,
            handles: Vec::new(),
            cancel_token: None,
        }
    }

    pub async fn start_signals(
        &mut self,
        session_id: String,
        camera: Arc<dyn CameraFeed>,
        config: &ProctorConfig,
        cancel_token: CancellationToken,
    ) -> Result<UnboundedReceiver<RawSignal>> {
        if !self.handles.is_empty() {
            bail!("signal sources already active");
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        self.handles.push(tokio::spawn(host_watch_loop(
            notify_rx,
            out_tx.clone(),
            cancel_token.clone(),
        )));
        self.handles.push(tokio::spawn(sampling_loop(
            session_id,
            camera,
            Duration::from_millis(config.frame_period_ms),
            Duration::from_millis(config.capture_timeout_ms),
            out_tx,
            cancel_token.clone(),
        )));

        self.notifications = Some(notify_tx);
        self.cancel_token = Some(cancel_token);
        Ok(out_rx)
    }

    pub async fn stop_signals(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.notifications = None;

        for handle in self.handles.drain(..) {
            handle
                .await
                .context("signal source task failed to join")?;
        }
        info!("signal sources stopped");
        Ok(())
    }

    pub fn report_focus_changed(&self, visible: bool) {
        self.notify(HostNotification::FocusChanged { visible });
    }

    pub fn report_pointer_exit(&self) {
        self.notify(HostNotification::PointerExit);
    }

    pub fn report_pointer_entry(&self) {
        self.notify(HostNotification::PointerEntry);
    }

    pub fn report_key_press(&self) {
        self.notify(HostNotification::KeyPress);
    }

    fn notify(&self, notification: HostNotification) {
        // Dropped silently once the session has ended.
        if let Some(sender) = &self.notifications {
            let _ = sender.send(notification);
        }
    }
}
