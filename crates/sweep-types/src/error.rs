use thiserror::Error;

/// The error taxonomy shared by the store, the coordinator API, and the
/// worker agent. Each variant maps onto exactly one HTTP status at the
/// API boundary and one retry decision at the worker boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request body malformed or missing required fields.
    #[error("schema error: {0}")]
    Schema(String),

    /// The transition demanded is not legal given the job's current
    /// status (e.g. finishing a job that isn't `SERVED`).
    #[error("job {job_id} is not claimable: {reason}")]
    NotClaimable { job_id: i64, reason: String },

    /// Operator PIN mismatch on `/change_job_status`.
    #[error("unauthorized: pin mismatch")]
    Unauthorized,

    /// The underlying database write failed.
    #[error("store write failed: {0}")]
    StoreWrite(#[source] anyhow::Error),

    /// A worker-side HTTP call failed in a way that's worth retrying.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The referenced job id does not exist.
    #[error("job {0} not found")]
    NotFound(i64),
}

impl DispatchError {
    /// Whether a worker should treat this as retryable with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::TransientNetwork(_))
    }
}
