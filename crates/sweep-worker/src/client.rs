use reqwest::{Client, StatusCode};
use sweep_types::{DispatchError, PingRequest, RequestJobResponse, UpdateJobStatusRequest};

fn transient(err: reqwest::Error) -> DispatchError {
    DispatchError::TransientNetwork(err.to_string())
}

/// `POST /request_job`. `Ok(None)` means the coordinator has no more
/// work (spec §4.4 step 3: `404` → exit normally, not an error).
pub async fn request_job(
    client: &Client,
    base_url: &str,
    identity: &str,
) -> Result<Option<RequestJobResponse>, DispatchError> {
    let response = client
        .post(format!("{base_url}/request_job"))
        .json(&serde_json::json!({ "requested_by": identity }))
        .send()
        .await
        .map_err(transient)?;

    match response.status() {
        StatusCode::OK => response.json().await.map(Some).map_err(transient),
        StatusCode::NOT_FOUND => Ok(None),
        other => Err(DispatchError::Schema(format!(
            "request_job returned unexpected status {other}"
        ))),
    }
}

/// `POST /ping`.
pub async fn ping(client: &Client, base_url: &str, job_id: i64) -> Result<(), DispatchError> {
    let response = client
        .post(format!("{base_url}/ping"))
        .json(&PingRequest {
            id: None,
            job_id: Some(job_id),
        })
        .send()
        .await
        .map_err(transient)?;

    match response.status() {
        StatusCode::OK => Ok(()),
        StatusCode::NOT_FOUND => Err(DispatchError::NotClaimable {
            job_id,
            reason: "job is not SERVED".to_string(),
        }),
        other => Err(DispatchError::Schema(format!("ping returned unexpected status {other}"))),
    }
}

/// `POST /update_job_status`. A `404` is treated as "already recorded"
/// per spec §7 and is not retried by the caller.
pub async fn update_job_status(
    client: &Client,
    base_url: &str,
    job_id: i64,
    status: &str,
    message: &str,
) -> Result<(), DispatchError> {
    let response = client
        .post(format!("{base_url}/update_job_status"))
        .json(&UpdateJobStatusRequest {
            job_id,
            status: status.to_string(),
            message: message.to_string(),
        })
        .send()
        .await
        .map_err(transient)?;

    match response.status() {
        StatusCode::OK => Ok(()),
        StatusCode::NOT_FOUND => Err(DispatchError::NotClaimable {
            job_id,
            reason: "job was not SERVED when reported".to_string(),
        }),
        other => Err(DispatchError::Schema(format!(
            "update_job_status returned unexpected status {other}"
        ))),
    }
}
