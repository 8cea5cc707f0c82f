//! SQLite implementation of the sweep dispatcher's job store.
//!
//! This crate provides the durable, concurrency-safe `JobStore` that the
//! coordinator API and the reaper both sit on top of.
//!
//! # Features
//!
//! - A single writer lock serializes every mutating operation, with each
//!   transition committed inside one SQLite transaction, so a history
//!   entry never appears without its status change or vice versa.
//! - `claim_next` is equivalent to an atomic
//!   `SELECT ... WHERE status = 'PENDING' ORDER BY id LIMIT 1` followed
//!   by an `UPDATE` of that row: concurrent callers racing for the same
//!   job never both win it.
//! - Two reaper surfaces (`reap_stale_served`, `reap_aborted`) recycle
//!   jobs whose worker went silent or whose abort is old enough to retry.
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE jobs (
//!     id INTEGER PRIMARY KEY,
//!     requested_by TEXT NOT NULL DEFAULT '',
//!     request_timestamp INTEGER NOT NULL DEFAULT 0,
//!     completion_timestamp INTEGER NOT NULL DEFAULT 0,
//!     required_time INTEGER NOT NULL DEFAULT 0,
//!     last_ping_timestamp INTEGER NOT NULL DEFAULT 0,
//!     status TEXT NOT NULL DEFAULT 'PENDING',
//!     history TEXT NOT NULL DEFAULT '[]',
//!     parameters TEXT NOT NULL
//! );
//!
//! CREATE TABLE api_stats (
//!     endpoint TEXT NOT NULL,
//!     method TEXT NOT NULL,
//!     request_count INTEGER NOT NULL DEFAULT 0,
//!     last_updated INTEGER NOT NULL DEFAULT 0,
//!     UNIQUE(endpoint, method)
//! );
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sweep_store::SqliteJobStore;
//!
//! let store = SqliteJobStore::connect("sqlite://sweep.db").await?;
//! store.create_jobs(points, true).await?;
//! let job = store.claim_next("alice@host(htc)").await?;
//! ```

mod clock;
mod job_store;
mod schema;
mod sqlite_store;

pub use clock::{Clock, SystemClock};
pub use job_store::{ApiStatEntry, DatabaseInfo, JobCounts, JobStore, PagedJobs};
pub use sqlite_store::SqliteJobStore;
