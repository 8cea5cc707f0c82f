//! Periodic recycling of stalled and aged-out jobs.
//!
//! Grounded in the original dispatcher's cleanup loop (`job_cleaner.py`),
//! which ran as a separate process waking on a fixed poll interval.
//! Per spec.md §4.2, the idle-SERVED sweep runs every cycle (`idle_timeout`
//! is only the staleness cutoff, not its own cadence); only the
//! aborted-job sweep is independently throttled, running no more often
//! than once per `aborted_age` seconds regardless of `poll_interval`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sweep_store::{Clock, JobStore};
use tokio::sync::oneshot;
use tracing::{error, info};

#[derive(Debug, Clone, Copy)]
pub struct ReaperConfig {
    /// How often the reaper wakes, and thus how often the idle-SERVED
    /// sweep runs.
    pub poll_interval: i64,
    /// A `SERVED` job whose last ping is older than this is reclaimed.
    pub idle_timeout: i64,
    /// An `ABORTED` job older than this is retried.
    pub aborted_age: i64,
}

pub struct Reaper {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    config: ReaperConfig,
    last_aborted_check: AtomicI64,
}

impl Reaper {
    pub fn new(store: Arc<dyn JobStore>, clock: Arc<dyn Clock>, config: ReaperConfig) -> Arc<Self> {
        let now = clock.now();
        Arc::new(Self {
            store,
            clock,
            config,
            last_aborted_check: AtomicI64::new(now),
        })
    }

    /// Run the idle-SERVED sweep every call, and the aborted sweep only
    /// when it's due. Errors from the store are logged and swallowed — a
    /// failed cycle must never bring down the coordinator; the next tick
    /// tries again.
    pub async fn tick(&self) {
        match self.store.reap_stale_served(self.config.idle_timeout).await {
            Ok(count) if count > 0 => info!(count, "reaper: reclaimed idle SERVED jobs"),
            Ok(_) => {}
            Err(err) => error!(%err, "reaper: idle sweep failed"),
        }

        let now = self.clock.now();
        if now - self.last_aborted_check.load(Ordering::SeqCst) >= self.config.aborted_age {
            self.last_aborted_check.store(now, Ordering::SeqCst);
            match self.store.reap_aborted(self.config.aborted_age).await {
                Ok(count) if count > 0 => info!(count, "reaper: requeued aged ABORTED jobs"),
                Ok(_) => {}
                Err(err) => error!(%err, "reaper: aborted sweep failed"),
            }
        }
    }

    /// Spawn the reaper loop on the current runtime. Returns a handle
    /// that stops the loop (after its current tick) when dropped or
    /// explicitly triggered.
    pub fn spawn(self: Arc<Self>) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let reaper = self;
        let poll_interval = Duration::from_secs(reaper.config.poll_interval.max(1) as u64);

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("reaper: shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        reaper.tick().await;
                    }
                }
            }
        });

        ReaperHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

/// Handle to a spawned reaper loop. Dropping it requests shutdown
/// without waiting for the loop to stop; call [`ReaperHandle::shutdown`]
/// to wait for it.
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl ReaperHandle {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_testing::{fixture_store, sample_parameters};
    use sweep_types::JobStatus;

    #[tokio::test]
    async fn tick_runs_the_idle_sweep_every_call() {
        let fx = fixture_store(1_000).await;
        fx.store.create_jobs(sample_parameters(), true).await.unwrap();
        let job = fx.store.claim_next("silent@host(gpu)").await.unwrap().unwrap();

        let store = fx.arc_store();
        let reaper = Reaper::new(
            store.clone(),
            fx.clock.clone(),
            ReaperConfig {
                poll_interval: 10,
                idle_timeout: 60,
                aborted_age: 1_800,
            },
        );

        // Nothing is idle yet: last_ping was just seeded at claim time.
        reaper.tick().await;
        let still_served = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(still_served.status, JobStatus::Served);

        // The idle sweep runs on every tick, not just once per idle_timeout:
        // a single tick past the cutoff is enough to reclaim the job.
        fx.clock.advance(70);
        reaper.tick().await;
        let reclaimed = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(reclaimed.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn tick_throttles_the_aborted_sweep_by_aborted_age() {
        let fx = fixture_store(1_000).await;
        fx.store.create_jobs(sample_parameters(), true).await.unwrap();
        let job = fx.store.claim_next("worker@host(gpu)").await.unwrap().unwrap();
        fx.store
            .finish(job.id, JobStatus::Aborted, "boom")
            .await
            .unwrap();

        // Jump far enough ahead that the job is already well past the
        // age cutoff before the reaper is even constructed, isolating the
        // due-gate from the age check.
        fx.clock.set(2_000);

        let store = fx.arc_store();
        let reaper = Reaper::new(
            store.clone(),
            fx.clock.clone(),
            ReaperConfig {
                poll_interval: 10,
                idle_timeout: 60,
                aborted_age: 100,
            },
        );

        // `Reaper::new` seeds `last_aborted_check` to construction time, so
        // this tick isn't due yet even though the job is long past aged-out.
        reaper.tick().await;
        let still_aborted = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(still_aborted.status, JobStatus::Aborted);

        fx.clock.advance(100);
        reaper.tick().await;
        let reclaimed = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(reclaimed.status, JobStatus::Pending);
    }
}
