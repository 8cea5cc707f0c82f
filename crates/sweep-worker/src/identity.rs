use std::process::Command;

/// Build the worker's self-reported identity, `user@host(class)` (spec
/// §4.4, §6). `user` comes from the environment the same way the
/// original shell-launched agent read it; `host` falls back to shelling
/// out to `hostname` once at startup since the standard library has no
/// hostname API.
pub fn worker_identity(machine_class: &str) -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname();
    format!("{user}@{host}({machine_class})")
}

fn hostname() -> String {
    if let Ok(host) = std::env::var("HOSTNAME") {
        if !host.is_empty() {
            return host;
        }
    }
    Command::new("hostname")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_has_the_user_at_host_class_shape() {
        std::env::set_var("HOSTNAME", "gpu-node-03");
        std::env::set_var("USER", "alice");
        let identity = worker_identity("htc");
        assert_eq!(identity, "alice@gpu-node-03(htc)");
    }
}
