use serde_json::json;
use sweep_types::WorkerConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, run_command: Vec<String>, machine_type: &str) -> WorkerConfig {
    WorkerConfig {
        exp_id: "sim1".to_string(),
        job_server: "http://127.0.0.1".to_string(),
        port: server.address().port(),
        run_command,
        machine_type: machine_type.to_string(),
        heart_bit_interval: 60.0,
        number_of_parallel_process: 1,
    }
}

#[tokio::test]
async fn exits_cleanly_when_the_queue_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/request_job"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = config_for(&server, vec!["true".to_string()], "desktop");
    let code = sweep_worker::run(config).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn reports_done_after_a_successful_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/request_job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": 1,
            "parameters": {"lr": 0.1},
            "status": "SERVED",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/request_job"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/update_job_status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, vec!["true".to_string()], "desktop");
    let code = sweep_worker::run(config).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn reports_aborted_when_the_child_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/request_job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": 2,
            "parameters": {},
            "status": "SERVED",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/request_job"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/update_job_status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, vec!["false".to_string()], "desktop");
    let code = sweep_worker::run(config).await;
    assert_eq!(code, 0);
}

#[tokio::test]
async fn htc_machines_exit_after_a_single_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/request_job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": 3,
            "parameters": {},
            "status": "SERVED",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/update_job_status"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, vec!["true".to_string()], "htc");
    let code = sweep_worker::run(config).await;
    assert_eq!(code, 0);
}
