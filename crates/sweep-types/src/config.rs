use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The coordinator's on-disk JSON configuration (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
    #[serde(rename = "expId")]
    pub exp_id: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub server_port: u16,
    #[serde(default)]
    pub dashboard_port: Option<u16>,
    #[serde(rename = "jobDB")]
    pub job_db: String,
    pub parameters: ParameterGrid,
    #[serde(default)]
    pub fresh_start: bool,
    #[serde(rename = "abortedJobResetTimeout", default = "default_aborted_age")]
    pub aborted_job_reset_timeout: u64,
    #[serde(rename = "idleTimeout", default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(rename = "pollingInterval", default = "default_polling_interval")]
    pub polling_interval: u64,
    pub status_change_pin: String,
    #[serde(default)]
    pub enable_ngork: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_aborted_age() -> u64 {
    30 * 60
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_polling_interval() -> u64 {
    60
}

/// `parameters` in the coordinator config: a map of parameter name to the
/// list of values it ranges over. The Cartesian product of these lists
/// defines the sweep's job population, in the order spec §3 requires
/// (dense ids `0..N-1` assigned in generation order).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ParameterGrid(pub BTreeMap<String, Vec<Value>>);

impl ParameterGrid {
    /// Expand the grid into one JSON object per point in the Cartesian
    /// product, in stable order: the first-named parameter varies
    /// slowest, the last-named varies fastest.
    pub fn expand(&self) -> Vec<Value> {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();

        let mut combos: Vec<BTreeMap<String, Value>> = vec![BTreeMap::new()];
        for key in keys {
            let values = &self.0[key];
            let mut next = Vec::with_capacity(combos.len() * values.len().max(1));
            for combo in &combos {
                for value in values {
                    let mut extended = combo.clone();
                    extended.insert(key.clone(), value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }

        combos
            .into_iter()
            .map(|combo| Value::Object(combo.into_iter().collect()))
            .collect()
    }
}

/// The worker's on-disk JSON configuration (spec §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(rename = "expId")]
    pub exp_id: String,
    pub job_server: String,
    pub port: u16,
    pub run_command: Vec<String>,
    pub machine_type: String,
    #[serde(rename = "heartBitInterval")]
    pub heart_bit_interval: f64,
    #[serde(rename = "number_of_parallel_process", default = "default_parallelism")]
    pub number_of_parallel_process: u32,
}

fn default_parallelism() -> u32 {
    1
}

impl WorkerConfig {
    /// `"htc"` machines must exit after their first job (spec §4.4, §GLOSSARY).
    pub fn is_one_shot(&self) -> bool {
        self.machine_type.eq_ignore_ascii_case("htc")
    }

    pub fn base_url(&self) -> String {
        format!("{}:{}", self.job_server, self.port)
    }
}
