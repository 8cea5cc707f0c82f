use sweep_types::DispatchError;
use thiserror::Error;

/// Worker-side error taxonomy (spec §5.2). `Dispatch` wraps whatever the
/// coordinator told us; the other variants are local failures that can
/// happen before a request is even made.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to launch child process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("failed to prepare job workdir: {0}")]
    WorkdirFailed(#[source] std::io::Error),

    #[error("failed to wait on child process: {0}")]
    WaitFailed(#[source] std::io::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
