use async_trait::async_trait;
use sweep_types::{DispatchError, Job, JobStatus};

/// Job counts grouped by status, as returned by `counts_by_status`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct JobCounts {
    pub pending: i64,
    pub served: i64,
    pub done: i64,
    pub aborted: i64,
}

/// One page of `list_paginated`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PagedJobs {
    pub jobs: Vec<Job>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

/// One row of `api_stats`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiStatEntry {
    pub endpoint: String,
    pub method: String,
    pub request_count: i64,
    pub last_updated: i64,
}

/// Diagnostics returned by `GET /database_info`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseInfo {
    pub jobs_count: i64,
    pub api_stats_count: i64,
    pub indices: Vec<String>,
}

/// The durable, concurrency-safe job state machine described in spec §4.1.
///
/// Every mutating method is all-or-nothing: on `Err` the caller must see
/// no effect, and on `Ok` the transition (including its history entry)
/// has already been flushed to stable storage.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Replace the jobs table with one `PENDING` row per element of
    /// `params`, in order, as dense ids `0..params.len()`. If
    /// `reset_counters`, also clears `api_stats`.
    async fn create_jobs(
        &self,
        params: Vec<serde_json::Value>,
        reset_counters: bool,
    ) -> Result<usize, DispatchError>;

    /// Atomically claim the lowest-id `PENDING` job for `worker_id`.
    /// Returns `Ok(None)` when no `PENDING` job exists.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, DispatchError>;

    /// Move a `SERVED` job to `DONE` or `ABORTED`. `Err(NotClaimable)` if
    /// the job isn't currently `SERVED` (including on a repeated call —
    /// this makes `finish` at-most-once).
    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
        message: &str,
    ) -> Result<Job, DispatchError>;

    /// Refresh `last_ping_timestamp` on a `SERVED` job.
    async fn ping(&self, id: i64) -> Result<(), DispatchError>;

    /// Operator-initiated transition to `DONE`, `ABORTED`, or `PENDING`.
    /// Transitioning to `PENDING` zeros every execution field, as at
    /// creation, so the job can be reclaimed.
    async fn override_status(
        &self,
        id: i64,
        new_status: JobStatus,
        reason: &str,
    ) -> Result<Job, DispatchError>;

    /// Return every `SERVED` job whose last ping is older than
    /// `idle_threshold` seconds to `PENDING`. Returns the count reaped.
    async fn reap_stale_served(&self, idle_threshold: i64) -> Result<u64, DispatchError>;

    /// Return every `ABORTED` job older than `aborted_age` seconds to
    /// `PENDING`. Returns the count reaped.
    async fn reap_aborted(&self, aborted_age: i64) -> Result<u64, DispatchError>;

    async fn get(&self, id: i64) -> Result<Option<Job>, DispatchError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, DispatchError>;

    async fn list_paginated(
        &self,
        page: i64,
        per_page: i64,
        status_filter: Option<JobStatus>,
        id_filter: Option<i64>,
    ) -> Result<PagedJobs, DispatchError>;

    async fn counts_by_status(&self) -> Result<JobCounts, DispatchError>;

    /// All completed (`DONE`) jobs, used to compute `/job_stats`.
    async fn list_done(&self) -> Result<Vec<Job>, DispatchError>;

    async fn api_stats(&self) -> Result<Vec<ApiStatEntry>, DispatchError>;

    async fn database_info(&self) -> Result<DatabaseInfo, DispatchError>;

    /// Increment the counter for `(endpoint, method)`. Best-effort: this
    /// must never hold up the caller for long, so implementations may
    /// use a lock separate from the main writer lock.
    async fn record_api_call(&self, endpoint: &str, method: &str) -> Result<(), DispatchError>;
}
