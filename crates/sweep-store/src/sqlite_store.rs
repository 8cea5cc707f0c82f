use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::{info, warn};

use sweep_types::{DispatchError, HistoryEntry, Job, JobStatus};

use crate::clock::{Clock, SystemClock};
use crate::job_store::{ApiStatEntry, DatabaseInfo, JobCounts, JobStore, PagedJobs};
use crate::schema::ensure_schema;

/// SQLite-backed job store.
///
/// `writer_lock` serializes every mutating operation so that a
/// transition is always "select the row, decide, update, append
/// history" as a single unit — `claim_next` races resolve here, not in
/// SQL, because SQLite has no `SELECT ... FOR UPDATE SKIP LOCKED`.
/// `api_lock` is a separate, short-lived lock for counters so a burst of
/// read traffic never queues up behind job writers.
pub struct SqliteJobStore {
    pool: SqlitePool,
    writer_lock: Mutex<()>,
    api_lock: Mutex<()>,
    clock: Arc<dyn Clock>,
}

impl SqliteJobStore {
    /// Open (creating if absent) the SQLite file at `path` and ensure
    /// its schema exists.
    pub async fn connect(path: &str) -> Result<Self, DispatchError> {
        Self::connect_with_clock(path, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        path: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DispatchError> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        ensure_schema(&pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        info!(%path, "job store opened");

        Ok(Self {
            pool,
            writer_lock: Mutex::new(()),
            api_lock: Mutex::new(()),
            clock,
        })
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }
}

fn parse_history(raw: &str) -> Vec<HistoryEntry> {
    match serde_json::from_str(raw) {
        Ok(history) => history,
        Err(err) => {
            warn!(%err, "corrupt history JSON, substituting empty history");
            Vec::new()
        }
    }
}

fn parse_parameters(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or(serde_json::Value::Null)
}

fn row_to_job(row: &SqliteRow) -> Result<Job, DispatchError> {
    let status_raw: String = row.try_get("status").map_err(|e| DispatchError::StoreWrite(e.into()))?;
    let status = JobStatus::parse(&status_raw).ok_or_else(|| {
        DispatchError::StoreWrite(anyhow::anyhow!("unrecognized stored status: {status_raw}"))
    })?;
    let history_raw: String = row.try_get("history").map_err(|e| DispatchError::StoreWrite(e.into()))?;
    let parameters_raw: String =
        row.try_get("parameters").map_err(|e| DispatchError::StoreWrite(e.into()))?;

    Ok(Job {
        id: row.try_get("id").map_err(|e| DispatchError::StoreWrite(e.into()))?,
        parameters: parse_parameters(&parameters_raw),
        status,
        requested_by: row
            .try_get("requested_by")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?,
        request_timestamp: row
            .try_get("request_timestamp")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?,
        completion_timestamp: row
            .try_get("completion_timestamp")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?,
        required_time: row
            .try_get("required_time")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?,
        last_ping_timestamp: row
            .try_get("last_ping_timestamp")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?,
        history: parse_history(&history_raw),
    })
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create_jobs(
        &self,
        params: Vec<serde_json::Value>,
        reset_counters: bool,
    ) -> Result<usize, DispatchError> {
        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        sqlx::query("DELETE FROM jobs")
            .execute(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        if reset_counters {
            sqlx::query("DELETE FROM api_stats")
                .execute(&mut *tx)
                .await
                .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        }

        let count = params.len();
        for (id, params) in params.into_iter().enumerate() {
            let job = Job::new_pending(id as i64, params);
            let params_json = serde_json::to_string(&job.parameters)
                .map_err(|e| DispatchError::StoreWrite(e.into()))?;
            let history_json = serde_json::to_string(&job.history)
                .map_err(|e| DispatchError::StoreWrite(e.into()))?;
            sqlx::query(
                "INSERT INTO jobs (id, requested_by, request_timestamp, completion_timestamp, \
                 required_time, last_ping_timestamp, status, history, parameters) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(job.id)
            .bind(&job.requested_by)
            .bind(job.request_timestamp)
            .bind(job.completion_timestamp)
            .bind(job.required_time)
            .bind(job.last_ping_timestamp)
            .bind(job.status.as_str())
            .bind(&history_json)
            .bind(&params_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        }

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        info!(count, "created jobs");
        Ok(count)
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, DispatchError> {
        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let row = sqlx::query("SELECT * FROM jobs WHERE status = 'PENDING' ORDER BY id LIMIT 1")
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let Some(row) = row else {
            tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
            return Ok(None);
        };

        let mut job = row_to_job(&row)?;
        let now = self.now();
        job.status = JobStatus::Served;
        job.requested_by = worker_id.to_string();
        job.request_timestamp = now;
        // Seeded to claim time, not zero: a job just handed out must
        // survive at least `idle_timeout` seconds of silence before the
        // reaper treats it as abandoned (spec §8, silent-worker scenario).
        job.last_ping_timestamp = now;
        job.history.push(HistoryEntry::new(
            format!("{worker_id} requests this job for execution"),
            now,
        ));
        let history_json =
            serde_json::to_string(&job.history).map_err(|e| DispatchError::StoreWrite(e.into()))?;

        sqlx::query(
            "UPDATE jobs SET status = 'SERVED', requested_by = ?, request_timestamp = ?, \
             last_ping_timestamp = ?, history = ? WHERE id = ?",
        )
        .bind(&job.requested_by)
        .bind(job.request_timestamp)
        .bind(job.last_ping_timestamp)
        .bind(&history_json)
        .bind(job.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        info!(job_id = job.id, %worker_id, "job claimed");
        Ok(Some(job))
    }

    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
        message: &str,
    ) -> Result<Job, DispatchError> {
        if !matches!(status, JobStatus::Done | JobStatus::Aborted) {
            return Err(DispatchError::Schema(
                "finish status must be DONE or ABORTED".to_string(),
            ));
        }

        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let Some(row) = row else {
            return Err(DispatchError::NotFound(id));
        };

        let mut job = row_to_job(&row)?;
        if job.status != JobStatus::Served {
            return Err(DispatchError::NotClaimable {
                job_id: id,
                reason: format!("job is {} not SERVED", job.status),
            });
        }

        let now = self.now();
        job.status = status;
        job.completion_timestamp = now;
        job.required_time = now - job.request_timestamp;
        let reason = if message.is_empty() {
            "No reason provided".to_string()
        } else {
            message.to_string()
        };
        job.history.push(HistoryEntry::new(reason, now));
        let history_json =
            serde_json::to_string(&job.history).map_err(|e| DispatchError::StoreWrite(e.into()))?;

        sqlx::query(
            "UPDATE jobs SET status = ?, completion_timestamp = ?, required_time = ?, history = ? \
             WHERE id = ?",
        )
        .bind(job.status.as_str())
        .bind(job.completion_timestamp)
        .bind(job.required_time)
        .bind(&history_json)
        .bind(job.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        info!(job_id = job.id, status = job.status.as_str(), "job finished");
        Ok(job)
    }

    async fn ping(&self, id: i64) -> Result<(), DispatchError> {
        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let row = sqlx::query("SELECT status FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let Some(row) = row else {
            return Err(DispatchError::NotFound(id));
        };
        let status_raw: String = row.try_get("status").map_err(|e| DispatchError::StoreWrite(e.into()))?;
        if JobStatus::parse(&status_raw) != Some(JobStatus::Served) {
            return Err(DispatchError::NotClaimable {
                job_id: id,
                reason: "job is not SERVED".to_string(),
            });
        }

        let now = self.now();
        sqlx::query("UPDATE jobs SET last_ping_timestamp = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        Ok(())
    }

    async fn override_status(
        &self,
        id: i64,
        new_status: JobStatus,
        reason: &str,
    ) -> Result<Job, DispatchError> {
        if !matches!(new_status, JobStatus::Done | JobStatus::Aborted | JobStatus::Pending) {
            return Err(DispatchError::Schema(
                "override target must be DONE, ABORTED, or PENDING".to_string(),
            ));
        }

        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let Some(row) = row else {
            return Err(DispatchError::NotFound(id));
        };

        let mut job = row_to_job(&row)?;
        if !matches!(job.status, JobStatus::Done | JobStatus::Aborted | JobStatus::Pending) {
            return Err(DispatchError::NotClaimable {
                job_id: id,
                reason: format!("job is {}, not overridable", job.status),
            });
        }

        let now = self.now();
        let old_status = job.status;
        let reason_text = if reason.is_empty() {
            format!("Manual Status Change: {old_status} -> {new_status} | No reason provided")
        } else {
            format!("Manual Status Change: {old_status} -> {new_status} | Reason: {reason}")
        };
        job.history.push(HistoryEntry::new(reason_text, now));
        job.status = new_status;

        if new_status == JobStatus::Pending {
            job.requested_by = String::new();
            job.request_timestamp = 0;
            job.completion_timestamp = 0;
            job.required_time = 0;
            job.last_ping_timestamp = 0;
        }

        let history_json =
            serde_json::to_string(&job.history).map_err(|e| DispatchError::StoreWrite(e.into()))?;

        sqlx::query(
            "UPDATE jobs SET status = ?, requested_by = ?, request_timestamp = ?, \
             completion_timestamp = ?, required_time = ?, last_ping_timestamp = ?, history = ? \
             WHERE id = ?",
        )
        .bind(job.status.as_str())
        .bind(&job.requested_by)
        .bind(job.request_timestamp)
        .bind(job.completion_timestamp)
        .bind(job.required_time)
        .bind(job.last_ping_timestamp)
        .bind(&history_json)
        .bind(job.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        info!(job_id = job.id, from = %old_status, to = %new_status, "job overridden");
        Ok(job)
    }

    async fn reap_stale_served(&self, idle_threshold: i64) -> Result<u64, DispatchError> {
        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let now = self.now();
        let cutoff = now - idle_threshold;

        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status = 'SERVED' AND last_ping_timestamp < ?",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let mut reaped = 0u64;
        for row in rows {
            let mut job = row_to_job(&row)?;
            let prev_requester = job.requested_by.clone();
            let silent_for = now - job.last_ping_timestamp;
            job.history.push(HistoryEntry::new(
                format!(
                    "Reaper: reset to PENDING. Machine '{prev_requester}' stopped responding \
                     ({silent_for}s of inactivity)."
                ),
                now,
            ));
            job.status = JobStatus::Pending;
            job.requested_by = String::new();
            job.request_timestamp = 0;
            job.completion_timestamp = 0;
            job.required_time = 0;
            job.last_ping_timestamp = 0;

            let history_json = serde_json::to_string(&job.history)
                .map_err(|e| DispatchError::StoreWrite(e.into()))?;

            sqlx::query(
                "UPDATE jobs SET status = 'PENDING', requested_by = '', request_timestamp = 0, \
                 completion_timestamp = 0, required_time = 0, last_ping_timestamp = 0, history = ? \
                 WHERE id = ?",
            )
            .bind(&history_json)
            .bind(job.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

            reaped += 1;
        }

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        if reaped > 0 {
            info!(count = reaped, "reaped stale SERVED jobs");
        }
        Ok(reaped)
    }

    async fn reap_aborted(&self, aborted_age: i64) -> Result<u64, DispatchError> {
        let _guard = self.writer_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let now = self.now();
        let cutoff = now - aborted_age;

        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status = 'ABORTED' AND completion_timestamp < ?",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let mut reaped = 0u64;
        for row in rows {
            let mut job = row_to_job(&row)?;
            let prev_requester = job.requested_by.clone();
            job.history.push(HistoryEntry::new(
                format!(
                    "Reaper: reset to PENDING. Previous execution failed on machine '{prev_requester}'."
                ),
                now,
            ));
            job.status = JobStatus::Pending;
            job.requested_by = String::new();
            job.request_timestamp = 0;
            job.completion_timestamp = 0;
            job.required_time = 0;
            job.last_ping_timestamp = 0;

            let history_json = serde_json::to_string(&job.history)
                .map_err(|e| DispatchError::StoreWrite(e.into()))?;

            sqlx::query(
                "UPDATE jobs SET status = 'PENDING', requested_by = '', request_timestamp = 0, \
                 completion_timestamp = 0, required_time = 0, last_ping_timestamp = 0, history = ? \
                 WHERE id = ?",
            )
            .bind(&history_json)
            .bind(job.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

            reaped += 1;
        }

        tx.commit().await.map_err(|e| DispatchError::StoreWrite(e.into()))?;
        if reaped > 0 {
            info!(count = reaped, "reaped aged ABORTED jobs");
        }
        Ok(reaped)
    }

    async fn get(&self, id: i64) -> Result<Option<Job>, DispatchError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        row.as_ref().map(row_to_job).transpose()
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, DispatchError> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE status = ? ORDER BY id")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        rows.iter().map(row_to_job).collect()
    }

    async fn list_paginated(
        &self,
        page: i64,
        per_page: i64,
        status_filter: Option<JobStatus>,
        id_filter: Option<i64>,
    ) -> Result<PagedJobs, DispatchError> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let (count_sql, jobs_sql) = match (status_filter, id_filter) {
            (Some(_), Some(_)) => (
                "SELECT COUNT(*) AS count FROM jobs WHERE status = ? AND id = ?",
                "SELECT * FROM jobs WHERE status = ? AND id = ? ORDER BY id LIMIT ? OFFSET ?",
            ),
            (Some(_), None) => (
                "SELECT COUNT(*) AS count FROM jobs WHERE status = ?",
                "SELECT * FROM jobs WHERE status = ? ORDER BY id LIMIT ? OFFSET ?",
            ),
            (None, Some(_)) => (
                "SELECT COUNT(*) AS count FROM jobs WHERE id = ?",
                "SELECT * FROM jobs WHERE id = ? ORDER BY id LIMIT ? OFFSET ?",
            ),
            (None, None) => (
                "SELECT COUNT(*) AS count FROM jobs",
                "SELECT * FROM jobs ORDER BY id LIMIT ? OFFSET ?",
            ),
        };

        let mut count_query = sqlx::query(count_sql);
        let mut jobs_query = sqlx::query(jobs_sql);
        if let Some(status) = status_filter {
            count_query = count_query.bind(status.as_str());
            jobs_query = jobs_query.bind(status.as_str());
        }
        if let Some(id) = id_filter {
            count_query = count_query.bind(id);
            jobs_query = jobs_query.bind(id);
        }
        let offset = (page - 1) * per_page;
        jobs_query = jobs_query.bind(per_page).bind(offset);

        let total_count: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?
            .try_get("count")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let rows = jobs_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        let jobs = rows.iter().map(row_to_job).collect::<Result<Vec<_>, _>>()?;

        let total_pages = (total_count + per_page - 1) / per_page.max(1);
        Ok(PagedJobs {
            jobs,
            total_count,
            total_pages: total_pages.max(1),
            current_page: page,
            per_page,
        })
    }

    async fn counts_by_status(&self) -> Result<JobCounts, DispatchError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        let mut counts = JobCounts::default();
        for row in rows {
            let status_raw: String =
                row.try_get("status").map_err(|e| DispatchError::StoreWrite(e.into()))?;
            let count: i64 = row.try_get("count").map_err(|e| DispatchError::StoreWrite(e.into()))?;
            match JobStatus::parse(&status_raw) {
                Some(JobStatus::Pending) => counts.pending = count,
                Some(JobStatus::Served) => counts.served = count,
                Some(JobStatus::Done) => counts.done = count,
                Some(JobStatus::Aborted) => counts.aborted = count,
                None => {}
            }
        }
        Ok(counts)
    }

    async fn list_done(&self) -> Result<Vec<Job>, DispatchError> {
        self.list_by_status(JobStatus::Done).await
    }

    async fn api_stats(&self) -> Result<Vec<ApiStatEntry>, DispatchError> {
        let rows = sqlx::query(
            "SELECT endpoint, method, request_count, last_updated FROM api_stats \
             ORDER BY request_count DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        rows.into_iter()
            .map(|row| {
                Ok(ApiStatEntry {
                    endpoint: row.try_get("endpoint").map_err(|e| DispatchError::StoreWrite(e.into()))?,
                    method: row.try_get("method").map_err(|e| DispatchError::StoreWrite(e.into()))?,
                    request_count: row
                        .try_get("request_count")
                        .map_err(|e| DispatchError::StoreWrite(e.into()))?,
                    last_updated: row
                        .try_get("last_updated")
                        .map_err(|e| DispatchError::StoreWrite(e.into()))?,
                })
            })
            .collect()
    }

    async fn database_info(&self) -> Result<DatabaseInfo, DispatchError> {
        let jobs_count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?
            .try_get("count")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        let api_stats_count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM api_stats")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DispatchError::StoreWrite(e.into()))?
            .try_get("count")
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        let index_rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'jobs' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        let indices = index_rows
            .into_iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DispatchError::StoreWrite(e.into()))?;

        Ok(DatabaseInfo {
            jobs_count,
            api_stats_count,
            indices,
        })
    }

    async fn record_api_call(&self, endpoint: &str, method: &str) -> Result<(), DispatchError> {
        let _guard = self.api_lock.lock().await;
        let now = self.now();
        sqlx::query(
            "INSERT INTO api_stats (endpoint, method, request_count, last_updated) \
             VALUES (?, ?, 1, ?) \
             ON CONFLICT(endpoint, method) DO UPDATE SET \
             request_count = request_count + 1, last_updated = excluded.last_updated",
        )
        .bind(endpoint)
        .bind(method)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DispatchError::StoreWrite(e.into()))?;
        Ok(())
    }
}
