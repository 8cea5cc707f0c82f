use std::path::PathBuf;

use serde_json::Value;

/// Build the child process's argv: the configured command prefix, one
/// `--key value` pair per sweep parameter (sorted by key for determinism),
/// then `--base_path <workdir>` (spec §4.4 step 4).
pub fn build_argv(command_prefix: &[String], parameters: &Value, base_path: &str) -> Vec<String> {
    let mut argv: Vec<String> = command_prefix.to_vec();

    if let Value::Object(map) = parameters {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            argv.push(format!("--{key}"));
            argv.push(value_to_arg(&map[key]));
        }
    }

    argv.push("--base_path".to_string());
    argv.push(base_path.to_string());
    argv
}

fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The working directory a job's child process runs with: one
/// subdirectory per job, scoped under the sweep's experiment id.
pub fn job_workdir(exp_id: &str, job_id: i64) -> PathBuf {
    PathBuf::from(exp_id).join(format!("job_{job_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn argv_orders_parameters_by_key_and_appends_base_path() {
        let prefix = vec!["python".to_string(), "train.py".to_string()];
        let params = json!({"seed": 2, "lr": 0.1, "name": "run-a"});
        let argv = build_argv(&prefix, &params, "/tmp/exp/job_5");
        assert_eq!(
            argv,
            vec![
                "python", "train.py", "--lr", "0.1", "--name", "run-a", "--seed", "2",
                "--base_path", "/tmp/exp/job_5",
            ]
        );
    }

    #[test]
    fn workdir_is_scoped_per_job() {
        assert_eq!(job_workdir("sim1", 7), PathBuf::from("sim1/job_7"));
    }
}
