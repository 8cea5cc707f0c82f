use anyhow::{Context, Result};
use clap::Parser;
use sweep_types::WorkerConfig;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "sweep-worker")]
#[command(about = "Worker agent: pulls jobs from a coordinator and supervises their execution")]
struct Cli {
    /// Path to the worker's JSON configuration file.
    #[arg(long)]
    config: String,
    /// Identifies this worker among others sharing the same exp_id, so
    /// their log files don't collide when several run on one host.
    #[arg(long, default_value_t = 0)]
    process_id: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading worker config at {}", cli.config))?;
    let config: WorkerConfig =
        serde_json::from_str(&raw).with_context(|| "parsing worker config")?;

    let identity = sweep_worker::identity::worker_identity(&config.machine_type);
    let log_dir = std::path::Path::new(&config.exp_id).join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory at {}", log_dir.display()))?;
    let log_path = log_dir.join(format!("runner_{identity}_{}.log", cli.process_id));
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file at {}", log_path.display()))?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let env_filter = || tracing_subscriber::EnvFilter::from_default_env();
    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(env_filter());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(env_filter());
    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let code = sweep_worker::run(config).await;
    std::process::exit(code);
}
