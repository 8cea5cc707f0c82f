use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::info;

use sweep_types::{
    ChangeJobStatusRequest, DispatchError, JobStatsBucket, JobStatsQuery, JobStatsResponse,
    JobStatus, JobsPaginatedQuery, PingRequest, RequestJobRequest, RequestJobResponse,
    UpdateJobStatusRequest,
};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_JOB_STATS_INTERVAL: i64 = 3600;

pub async fn request_job(
    State(state): State<AppState>,
    Json(body): Json<RequestJobRequest>,
) -> Result<Response, ApiError> {
    state.store.record_api_call("/request_job", "POST").await?;

    if body.requested_by.trim().is_empty() {
        return Err(DispatchError::Schema("requested_by must not be empty".to_string()).into());
    }

    match state.store.claim_next(&body.requested_by).await? {
        Some(job) => {
            info!(job_id = job.id, requested_by = %body.requested_by, "job claimed");
            Ok((
                StatusCode::OK,
                Json(RequestJobResponse {
                    job_id: job.id,
                    parameters: job.parameters,
                    status: job.status.as_str().to_string(),
                }),
            )
                .into_response())
        }
        None => Ok((StatusCode::NOT_FOUND, Json(json!({"error": "no pending jobs"}))).into_response()),
    }
}

pub async fn update_job_status(
    State(state): State<AppState>,
    Json(body): Json<UpdateJobStatusRequest>,
) -> Result<Response, ApiError> {
    state.store.record_api_call("/update_job_status", "POST").await?;

    let status = JobStatus::parse(&body.status).ok_or_else(|| {
        DispatchError::Schema(format!("status must be DONE or ABORTED, got {}", body.status))
    })?;
    if !matches!(status, JobStatus::Done | JobStatus::Aborted) {
        return Err(DispatchError::Schema("status must be DONE or ABORTED".to_string()).into());
    }

    let job = state
        .store
        .finish(body.job_id, status, &body.message)
        .await?;
    info!(job_id = job.id, status = job.status.as_str(), "job finished");
    Ok((StatusCode::OK, Json(job)).into_response())
}

pub async fn ping(
    State(state): State<AppState>,
    Json(body): Json<PingRequest>,
) -> Result<Response, ApiError> {
    state.store.record_api_call("/ping", "POST").await?;

    let job_id = body
        .job_id()
        .ok_or_else(|| DispatchError::Schema("missing id or job_id".to_string()))?;
    state.store.ping(job_id).await?;
    Ok((StatusCode::OK, Json(json!({"success": true}))).into_response())
}

pub async fn change_job_status(
    State(state): State<AppState>,
    Json(body): Json<ChangeJobStatusRequest>,
) -> Result<Response, ApiError> {
    state
        .store
        .record_api_call("/change_job_status", "POST")
        .await?;

    if body.pin != *state.status_change_pin {
        return Err(DispatchError::Unauthorized.into());
    }

    let new_status = JobStatus::parse(&body.new_status).ok_or_else(|| {
        DispatchError::Schema(format!("unrecognized status {}", body.new_status))
    })?;

    let job = state
        .store
        .override_status(body.job_id, new_status, &body.reason)
        .await?;
    info!(job_id = job.id, new_status = job.status.as_str(), "job overridden by operator");
    Ok((StatusCode::OK, Json(job)).into_response())
}

pub async fn jobs_paginated(
    State(state): State<AppState>,
    Query(query): Query<JobsPaginatedQuery>,
) -> Result<Response, ApiError> {
    state.store.record_api_call("/jobs_paginated", "GET").await?;

    let status_filter = match query.status.as_deref() {
        Some(raw) => Some(
            JobStatus::parse(raw)
                .ok_or_else(|| DispatchError::Schema(format!("unrecognized status {raw}")))?,
        ),
        None => None,
    };

    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(50);
    let result = state
        .store
        .list_paginated(page, per_page, status_filter, query.search_job_id)
        .await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

pub async fn job_stats(
    State(state): State<AppState>,
    Query(query): Query<JobStatsQuery>,
) -> Result<Response, ApiError> {
    state.store.record_api_call("/job_stats", "GET").await?;

    let interval = query.interval.unwrap_or(DEFAULT_JOB_STATS_INTERVAL);
    if interval <= 0 {
        return Err(DispatchError::Schema("interval must be positive".to_string()).into());
    }

    let done = state.store.list_done().await?;
    let done: Vec<_> = match &query.machine {
        Some(machine) => done
            .into_iter()
            .filter(|job| &job.requested_by == machine)
            .collect(),
        None => done,
    };

    if done.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(JobStatsResponse {
                interval,
                buckets: Vec::new(),
            }),
        )
            .into_response());
    }

    let min_completion = done.iter().map(|job| job.completion_timestamp).min().unwrap();
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    for job in &done {
        let bucket = (job.completion_timestamp - min_completion) / interval;
        *counts.entry(bucket).or_insert(0) += 1;
    }

    let buckets = counts
        .into_iter()
        .map(|(bucket, count)| JobStatsBucket { bucket, count })
        .collect();

    Ok((StatusCode::OK, Json(JobStatsResponse { interval, buckets })).into_response())
}

pub async fn api_stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.store.record_api_call("/api_stats", "GET").await?;
    let stats = state.store.api_stats().await?;
    Ok((StatusCode::OK, Json(json!({ "stats": stats }))).into_response())
}

pub async fn database_info(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.store.record_api_call("/database_info", "GET").await?;
    let info = state.store.database_info().await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "jobs_count": info.jobs_count,
            "api_stats_count": info.api_stats_count,
            "indexes": info.indices,
            "schema": {
                "jobs": ["id", "requested_by", "request_timestamp", "completion_timestamp",
                         "required_time", "last_ping_timestamp", "status", "history", "parameters"],
                "api_stats": ["endpoint", "method", "request_count", "last_updated"],
            },
        })),
    )
        .into_response())
}
