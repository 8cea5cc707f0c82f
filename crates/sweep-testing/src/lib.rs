//! Test doubles shared by the sweep dispatcher's crates.
//!
//! Nothing here ships in production; it exists so every crate's test
//! suite can stand up an isolated store and control time without
//! sleeping real seconds.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use sweep_store::{Clock, JobStore, SqliteJobStore};
use tempfile::TempDir;

/// A clock whose value only ever moves when a test says so.
#[derive(Debug)]
pub struct FakeClock {
    now: AtomicI64,
}

impl FakeClock {
    pub fn new(start: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(start),
        })
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, timestamp: i64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A `SqliteJobStore` backed by a fresh file in a temp directory, paired
/// with the `FakeClock` driving it. The `TempDir` must stay alive for as
/// long as the store is in use; it is returned so the caller owns that
/// lifetime.
pub struct FixtureStore {
    pub store: Arc<SqliteJobStore>,
    pub clock: Arc<FakeClock>,
    _dir: TempDir,
}

impl FixtureStore {
    /// A type-erased handle suitable for injecting into the reaper or the
    /// API router, which take `Arc<dyn JobStore>`.
    pub fn arc_store(&self) -> Arc<dyn JobStore> {
        self.store.clone()
    }
}

/// Open a fresh, isolated SQLite-backed store for a single test, with
/// time starting at `start_timestamp`.
pub async fn fixture_store(start_timestamp: i64) -> FixtureStore {
    let dir = TempDir::new().expect("create temp dir for test database");
    let db_path: &Path = dir.path();
    let db_file = db_path.join("sweep-test.db");
    let clock = FakeClock::new(start_timestamp);
    let store = SqliteJobStore::connect_with_clock(
        db_file.to_str().expect("temp path is valid UTF-8"),
        clock.clone(),
    )
    .await
    .expect("open sqlite fixture store");

    FixtureStore {
        store: Arc::new(store),
        clock,
        _dir: dir,
    }
}

/// Parameter grid used across several crates' tests: a 2x2 sweep over
/// `lr` and `seed`.
pub fn sample_parameters() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({"lr": 0.1, "seed": 1}),
        serde_json::json!({"lr": 0.1, "seed": 2}),
        serde_json::json!({"lr": 0.2, "seed": 1}),
        serde_json::json!({"lr": 0.2, "seed": 2}),
    ]
}
