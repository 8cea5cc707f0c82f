use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sweep_api::{build_router, AppState};
use sweep_store::JobStore;
use sweep_testing::{fixture_store, sample_parameters};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Returns the router plus the backing temp-dir store, which the caller
/// must keep alive for as long as the router is used.
async fn router_with_jobs(pin: &str) -> (axum::Router, sweep_testing::FixtureStore) {
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    let router = build_router(AppState::new(fx.arc_store(), pin));
    (router, fx)
}

#[tokio::test]
async fn request_job_returns_pending_job_then_404_when_exhausted() {
    let pin = "1234";
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(vec![json!({"x": 1})], true).await.unwrap();
    let app = build_router(AppState::new(fx.arc_store(), pin));

    let request = Request::builder()
        .method("POST")
        .uri("/request_job")
        .header("content-type", "application/json")
        .body(Body::from(json!({"requested_by": "alice@host(gpu)"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["job_id"], 0);
    assert_eq!(body["status"], "SERVED");

    let request = Request::builder()
        .method("POST")
        .uri("/request_job")
        .header("content-type", "application/json")
        .body(Body::from(json!({"requested_by": "bob@host(gpu)"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_job_rejects_empty_identity() {
    let (app, _fx) = router_with_jobs("1234").await;
    let request = Request::builder()
        .method("POST")
        .uri("/request_job")
        .header("content-type", "application/json")
        .body(Body::from(json!({"requested_by": ""}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_job_status_requires_served_job() {
    let (app, _fx) = router_with_jobs("1234").await;
    let request = Request::builder()
        .method("POST")
        .uri("/update_job_status")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"job_id": 0, "status": "DONE", "message": "ok"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn change_job_status_requires_correct_pin() {
    let pin = "secret-pin";
    let fx = fixture_store(1_000).await;
    fx.store.create_jobs(sample_parameters(), true).await.unwrap();
    fx.store.claim_next("alice@host(gpu)").await.unwrap();
    fx.store.finish(0, sweep_types::JobStatus::Done, "ok").await.unwrap();
    let app = build_router(AppState::new(fx.arc_store(), pin));

    let wrong_pin = Request::builder()
        .method("POST")
        .uri("/change_job_status")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"job_id": 0, "new_status": "PENDING", "reason": "rerun", "pin": "nope"})
                .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(wrong_pin).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let right_pin = Request::builder()
        .method("POST")
        .uri("/change_job_status")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"job_id": 0, "new_status": "PENDING", "reason": "rerun", "pin": pin})
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(right_pin).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "PENDING");
}

#[tokio::test]
async fn jobs_paginated_filters_by_status() {
    let (app, _fx) = router_with_jobs("1234").await;
    let request = Request::builder()
        .method("GET")
        .uri("/jobs_paginated?page=1&per_page=10&status=PENDING")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_count"], 4);
}

#[tokio::test]
async fn database_info_reports_table_counts() {
    let (app, _fx) = router_with_jobs("1234").await;
    let request = Request::builder()
        .method("GET")
        .uri("/database_info")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["jobs_count"], 4);
}
