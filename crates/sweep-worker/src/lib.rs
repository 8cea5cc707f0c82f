pub mod abort_message;
pub mod argv;
pub mod client;
mod error;
pub mod heartbeat;
pub mod identity;
pub mod process_group;

pub use error::WorkerError;

use std::process::Stdio;
use std::time::Duration;

use reqwest::Client;
use sweep_types::{RequestJobResponse, WorkerConfig};
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tracing::{error, info, warn};

use abort_message::ExitOutcome;

/// Drive the pull loop until the coordinator has no more jobs, a fatal
/// error occurs, or (for `htc` machines) a single job has been handled
/// (spec §4.4). Returns the process exit code.
pub async fn run(config: WorkerConfig) -> i32 {
    let identity = identity::worker_identity(&config.machine_type);
    let base_url = config.base_url();
    let client = Client::new();
    info!(%identity, %base_url, "worker starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut backoff = Backoff::new();

    loop {
        let job = match client::request_job(&client, &base_url, &identity).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                info!("coordinator has no more jobs, exiting");
                return 0;
            }
            Err(err) if err.is_retryable() => {
                warn!(%err, "transient error requesting a job");
                if !backoff.wait().await {
                    error!("giving up after repeated transient failures");
                    return 1;
                }
                continue;
            }
            Err(err) => {
                error!(%err, "fatal error requesting a job");
                return 1;
            }
        };
        backoff.reset();

        let job_id = job.job_id;
        match execute_job(&client, &config, &base_url, job, shutdown_rx.clone()).await {
            Ok(JobOutcome::Reported) => {}
            Ok(JobOutcome::ShuttingDown) => {
                info!(job_id, "shutdown signal received, exiting without polling for more work");
                return 0;
            }
            Err(WorkerError::Dispatch(err)) => {
                warn!(job_id, %err, "failed to report the job's outcome");
            }
            Err(err) => {
                error!(job_id, %err, "fatal error supervising the job's child process");
                return 1;
            }
        }

        if config.is_one_shot() {
            info!("machine_type is htc, exiting after one job");
            return 0;
        }
    }
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    ShuttingDown,
}

/// What happened to a job after `execute_job` returns `Ok`: either its
/// outcome was reported to the coordinator, or the worker was asked to
/// shut down mid-job and deliberately reported nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Reported,
    ShuttingDown,
}

/// Spawn the job's child process, supervise it to completion (or until
/// `shutdown_rx` reports a shutdown request), and report the outcome back
/// to the coordinator (spec §4.4 steps 4-8).
async fn execute_job(
    client: &Client,
    config: &WorkerConfig,
    base_url: &str,
    job: RequestJobResponse,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<JobOutcome, WorkerError> {
    let workdir = argv::job_workdir(&config.exp_id, job.job_id);
    std::fs::create_dir_all(&workdir).map_err(WorkerError::WorkdirFailed)?;

    let argv = argv::build_argv(&config.run_command, &job.parameters, &workdir.to_string_lossy());
    let (program, rest) = argv
        .split_first()
        .expect("run_command is validated non-empty when the config is loaded");

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(rest).stdout(Stdio::piped()).stderr(Stdio::piped());
    process_group::detach_into_own_group(&mut cmd);

    let mut child = cmd.spawn().map_err(WorkerError::SpawnFailed)?;
    let pid = child.id().unwrap_or(0);
    info!(job_id = job.job_id, pid, program, "child process started");

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let mut stderr = child.stderr.take().expect("stderr was piped");
    let stdout_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stdout.read_to_string(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    });

    let heartbeat = heartbeat::spawn(
        client.clone(),
        base_url.to_string(),
        job.job_id,
        Duration::from_secs_f64(config.heart_bit_interval),
    );

    let outcome = tokio::select! {
        status = child.wait() => WaitOutcome::Exited(status),
        _ = wait_for_shutdown(&mut shutdown_rx) => WaitOutcome::ShuttingDown,
    };

    let exit_status = match outcome {
        WaitOutcome::Exited(status) => status.map_err(WorkerError::WaitFailed)?,
        WaitOutcome::ShuttingDown => {
            warn!(job_id = job.job_id, pid, "shutdown requested, killing child process group");
            let _ = process_group::signal_group(pid, process_group::SIGTERM);
            let _ = child.wait().await;
            heartbeat.stop().await;
            stdout_task.abort();
            stderr_task.abort();
            // Shutting down is not a job outcome: don't report one (spec §4.4),
            // and the caller must exit rather than loop back to request_job.
            return Ok(JobOutcome::ShuttingDown);
        }
    };

    heartbeat.stop().await;
    let stdout_buf = stdout_task.await.unwrap_or_default();
    let stderr_buf = stderr_task.await.unwrap_or_default();
    let combined_output = format!("{stdout_buf}{stderr_buf}");

    let outcome = match exit_signal(&exit_status) {
        Some(signal) => ExitOutcome::Signal(signal),
        None => ExitOutcome::Code(exit_status.code().unwrap_or(-1)),
    };

    match outcome {
        ExitOutcome::Code(0) => {
            info!(job_id = job.job_id, "child process finished successfully");
            client::update_job_status(client, base_url, job.job_id, "DONE", "").await?;
        }
        other => {
            let message = abort_message::build_abort_message(other, &combined_output);
            warn!(job_id = job.job_id, %message, "child process did not finish cleanly");
            client::update_job_status(client, base_url, job.job_id, "ABORTED", &message).await?;
        }
    }

    Ok(JobOutcome::Reported)
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// Resolves once `rx` carries `true`. Used to race a job's child process
/// against a shutdown request without depending on real OS signals, so
/// the race is exercisable from tests.
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Bounded exponential backoff for transient request failures. Six
/// attempts tops out at 32s between tries before the worker gives up.
struct Backoff {
    attempt: u32,
}

impl Backoff {
    const MAX_ATTEMPTS: u32 = 6;

    fn new() -> Self {
        Self { attempt: 0 }
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Sleeps and returns `true` if another attempt is allowed, `false`
    /// once the attempt budget is exhausted.
    async fn wait(&mut self) -> bool {
        if self.attempt >= Self::MAX_ATTEMPTS {
            return false;
        }
        let delay = Duration::from_secs(1 << self.attempt.min(5));
        tokio::time::sleep(delay).await;
        self.attempt += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shutdown_test_config(dir: &std::path::Path) -> WorkerConfig {
        WorkerConfig {
            exp_id: dir.to_string_lossy().to_string(),
            job_server: "http://127.0.0.1".to_string(),
            port: 9, // discard port: nothing listens here
            run_command: vec!["sleep".to_string(), "5".to_string()],
            machine_type: "desktop".to_string(),
            heart_bit_interval: 60.0,
            number_of_parallel_process: 1,
        }
    }

    /// A shutdown mid-job must surface as `JobOutcome::ShuttingDown`, not
    /// `Reported` — `run()` relies on this to exit instead of looping back
    /// to `request_job` (spec §4.4 "Signal handling").
    #[tokio::test]
    async fn execute_job_reports_shutdown_without_contacting_the_coordinator() {
        let dir = tempfile::tempdir().unwrap();
        let config = shutdown_test_config(dir.path());
        let job = RequestJobResponse {
            job_id: 1,
            parameters: serde_json::json!({}),
            status: "SERVED".to_string(),
        };
        let client = Client::new();
        let base_url = config.base_url();

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });

        let outcome = execute_job(&client, &config, &base_url, job, rx).await.unwrap();
        assert_eq!(outcome, JobOutcome::ShuttingDown);
    }

    #[tokio::test]
    async fn execute_job_reports_done_when_no_shutdown_arrives() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = shutdown_test_config(dir.path());
        config.run_command = vec!["true".to_string()];
        let job = RequestJobResponse {
            job_id: 2,
            parameters: serde_json::json!({}),
            status: "SERVED".to_string(),
        };
        let client = Client::new();

        let server = wiremock_for_done().await;
        config.job_server = "http://127.0.0.1".to_string();
        config.port = server.address().port();
        let base_url = config.base_url();

        let (_tx, rx) = watch::channel(false);
        let outcome = execute_job(&client, &config, &base_url, job, rx).await.unwrap();
        assert_eq!(outcome, JobOutcome::Reported);
    }

    async fn wiremock_for_done() -> wiremock::MockServer {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/update_job_status"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }
}
