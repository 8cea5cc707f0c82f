const KEYWORDS: [&str; 4] = ["error", "exception", "failed", "fatal"];
const MAX_MATCHING_LINES: usize = 20;
const FALLBACK_TAIL_BYTES: usize = 2_000;
const MAX_MESSAGE_BYTES: usize = 4_000;

/// How a child process ended, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited normally with this code (0 means success).
    Code(i32),
    /// Killed by this signal (Unix only).
    Signal(i32),
}

impl ExitOutcome {
    /// Signals commonly associated with the OOM killer or a forced kill
    /// (`SIGKILL` = 9, `SIGTERM` = 15, `SIGSEGV` = 11, `SIGABRT` = 6).
    fn likely_cause(self) -> Option<&'static str> {
        match self {
            ExitOutcome::Signal(9) => Some("killed (commonly the OOM killer)"),
            ExitOutcome::Signal(15) => Some("terminated"),
            ExitOutcome::Signal(11) => Some("segmentation fault"),
            ExitOutcome::Signal(6) => Some("aborted"),
            ExitOutcome::Code(137) => Some("killed (commonly the OOM killer, 128+SIGKILL)"),
            ExitOutcome::Code(143) => Some("terminated (128+SIGTERM)"),
            _ => None,
        }
    }
}

/// Build the `message` field for a non-zero-exit `/update_job_status`
/// call: the exit outcome, a guess at common causes, and a compact,
/// keyword-filtered tail of the child's combined stdout/stderr (spec
/// §4.4 step 7, §6 supplemented features).
pub fn build_abort_message(outcome: ExitOutcome, combined_output: &str) -> String {
    let headline = match outcome {
        ExitOutcome::Code(code) => format!("child exited with code {code}"),
        ExitOutcome::Signal(signal) => format!("child killed by signal {signal}"),
    };
    let cause = outcome
        .likely_cause()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default();

    let tail = filtered_tail(combined_output);
    let mut message = format!("{headline}{cause}\n{tail}");
    truncate_to_bytes(&mut message, MAX_MESSAGE_BYTES);
    message
}

/// Lines case-insensitively containing one of the abort keywords, last
/// `MAX_MATCHING_LINES` of them; if none match, the raw tail truncated to
/// `FALLBACK_TAIL_BYTES`.
fn filtered_tail(output: &str) -> String {
    let matching: Vec<&str> = output
        .lines()
        .filter(|line| {
            let lower = line.to_ascii_lowercase();
            KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .collect();

    if matching.is_empty() {
        let mut fallback = output.to_string();
        truncate_to_bytes(&mut fallback, FALLBACK_TAIL_BYTES);
        return fallback;
    }

    let start = matching.len().saturating_sub(MAX_MATCHING_LINES);
    matching[start..].join("\n")
}

fn truncate_to_bytes(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_to_keyword_lines_when_present() {
        let output = "starting up\nloading data\nRuntimeError: divide by zero\nall clean now";
        let message = build_abort_message(ExitOutcome::Code(1), output);
        assert!(message.contains("RuntimeError"));
        assert!(!message.contains("loading data"));
    }

    #[test]
    fn falls_back_to_raw_tail_when_nothing_matches() {
        let output = "line one\nline two\nline three";
        let message = build_abort_message(ExitOutcome::Code(1), output);
        assert!(message.contains("line one"));
    }

    #[test]
    fn identifies_oom_style_kills() {
        let message = build_abort_message(ExitOutcome::Code(137), "");
        assert!(message.contains("OOM"));
    }

    #[test]
    fn message_never_exceeds_the_byte_cap() {
        let output = "error: ".to_string() + &"x".repeat(10_000);
        let message = build_abort_message(ExitOutcome::Code(1), &output);
        assert!(message.len() <= MAX_MESSAGE_BYTES);
    }
}
