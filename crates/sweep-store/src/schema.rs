use sqlx::SqlitePool;

/// Create the `jobs`/`api_stats` tables and their indices if absent.
///
/// A schema mismatch on open is fatal (spec §4.1 Failure semantics); this
/// only ever creates, never migrates, so an incompatible pre-existing
/// schema surfaces as a query error the first time it's used rather than
/// being silently papered over here.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY,
            requested_by TEXT NOT NULL DEFAULT '',
            request_timestamp INTEGER NOT NULL DEFAULT 0,
            completion_timestamp INTEGER NOT NULL DEFAULT 0,
            required_time INTEGER NOT NULL DEFAULT 0,
            last_ping_timestamp INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'PENDING',
            history TEXT NOT NULL DEFAULT '[]',
            parameters TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_stats (
            endpoint TEXT NOT NULL,
            method TEXT NOT NULL,
            request_count INTEGER NOT NULL DEFAULT 0,
            last_updated INTEGER NOT NULL DEFAULT 0,
            UNIQUE(endpoint, method)
        )
        "#,
    )
    .execute(pool)
    .await?;

    let indices = [
        "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_status_id ON jobs(status, id)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_last_ping ON jobs(last_ping_timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_status_ping ON jobs(status, last_ping_timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_requested_by ON jobs(requested_by)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_request_timestamp ON jobs(request_timestamp)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_completion_timestamp ON jobs(completion_timestamp)",
    ];
    for index in indices {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}
