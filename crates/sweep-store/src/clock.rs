use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now", injected into the store so tests can simulate the
/// passage of time instead of sleeping real seconds (see spec §8,
/// scenario 2: "after 70s of simulated time").
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// The real wall clock, used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs() as i64
    }
}
