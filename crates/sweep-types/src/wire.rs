use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /request_job`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestJobRequest {
    pub requested_by: String,
}

/// `200` response of `POST /request_job`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestJobResponse {
    pub job_id: i64,
    pub parameters: Value,
    pub status: String,
}

/// Body of `POST /update_job_status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateJobStatusRequest {
    pub job_id: i64,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Body of `POST /ping`. Accepts either `id` or `job_id` (spec §9 Open
/// Questions: newer clients send `job_id`, legacy ones send `id`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PingRequest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub job_id: Option<i64>,
}

impl PingRequest {
    pub fn job_id(&self) -> Option<i64> {
        self.job_id.or(self.id)
    }
}

/// Body of `POST /change_job_status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangeJobStatusRequest {
    pub job_id: i64,
    pub new_status: String,
    #[serde(default)]
    pub reason: String,
    pub pin: String,
}

/// Query params of `GET /jobs_paginated`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobsPaginatedQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search_job_id: Option<i64>,
}

/// Query params of `GET /job_stats`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobStatsQuery {
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub machine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatsBucket {
    pub bucket: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatsResponse {
    pub interval: i64,
    pub buckets: Vec<JobStatsBucket>,
}
