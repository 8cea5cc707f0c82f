use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tracing::warn;

use crate::client;

/// Network jitter padding subtracted from the configured heartbeat
/// period (spec §4.4 step 5: "every `heartbeat_period − 300ms`").
const JITTER_PADDING: Duration = Duration::from_millis(300);

pub struct HeartbeatHandle {
    cancel: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Signal cancellation and wait for the task to observe it. Does not
    /// send a final ping.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.join.await;
    }
}

/// Spawn a task that pings `job_id` every `period` until stopped. The
/// sleep is interrupted by cancellation rather than run to completion,
/// per spec §9 ("avoid sleeping the whole interval").
pub fn spawn(client: Client, base_url: String, job_id: i64, period: Duration) -> HeartbeatHandle {
    let period = period.saturating_sub(JITTER_PADDING).max(Duration::from_millis(100));
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    if let Err(err) = client::ping(&client, &base_url, job_id).await {
                        warn!(job_id, %err, "heartbeat ping failed");
                    }
                }
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    HeartbeatHandle { cancel: cancel_tx, join }
}
