//! # Sweep Types
//!
//! Shared data model for the sweep dispatcher: the job record and its
//! history, the wire DTOs exchanged between workers/dashboard and the
//! coordinator, the on-disk configuration shapes, and the error taxonomy
//! that every other crate in the workspace maps onto an HTTP status or a
//! retry decision.
//!
//! ## Core Concepts
//!
//! - [`Job`] is the coordinator's only unit of truth: immutable
//!   parameters plus mutable execution state, moving through exactly the
//!   four statuses in [`JobStatus`].
//! - [`HistoryEntry`] is the append-only audit trail attached to a job;
//!   every transition appends one, never rewrites one.
//! - The `wire` DTOs are what crosses the HTTP boundary; the job store
//!   never sees them directly, and the coordinator API never constructs
//!   a [`Job`] by hand — it always goes through the store.
//!
//! This crate owns no IO. It is the one place the status strings, field
//! names, and config keys are spelled, so the store, the API, and the
//! worker agent cannot drift from each other.

mod config;
mod error;
mod job;
mod wire;

// Re-export job/history types
pub use job::{HistoryEntry, Job, JobStatus};

// Re-export error taxonomy
pub use error::DispatchError;

// Re-export configuration shapes
pub use config::{CoordinatorConfig, ParameterGrid, WorkerConfig};

// Re-export wire DTOs
pub use wire::{
    ChangeJobStatusRequest, JobStatsBucket, JobStatsQuery, JobStatsResponse,
    JobsPaginatedQuery, PingRequest, RequestJobRequest, RequestJobResponse,
    UpdateJobStatusRequest,
};
