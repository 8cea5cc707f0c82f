use serde::{Deserialize, Serialize};

/// The four states a job can be in.
///
/// Legacy clients may send `NOT_STARTED` where current clients send
/// `PENDING`; both deserialize to [`JobStatus::Pending`], and this type
/// always serializes back out as `PENDING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Served,
    Done,
    Aborted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Served => "SERVED",
            JobStatus::Done => "DONE",
            JobStatus::Aborted => "ABORTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" | "NOT_STARTED" => Some(JobStatus::Pending),
            "SERVED" => Some(JobStatus::Served),
            "DONE" => Some(JobStatus::Done),
            "ABORTED" => Some(JobStatus::Aborted),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        JobStatus::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognized job status: {raw}"))
        })
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only entry in a job's audit trail.
///
/// History is strictly append-only; timestamps within a single job's
/// history are non-decreasing (they may tie when a transition and its
/// logging happen within the same clock tick).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub reason: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn new(reason: impl Into<String>, timestamp: i64) -> Self {
        Self {
            reason: reason.into(),
            timestamp,
        }
    }
}

/// A single unit of work in the sweep.
///
/// `id` and `parameters` are set once at creation and never change.
/// Every other field is owned exclusively by the job store; callers hold
/// only a transient copy and must not cache it across store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub parameters: serde_json::Value,
    pub status: JobStatus,
    pub requested_by: String,
    pub request_timestamp: i64,
    pub completion_timestamp: i64,
    pub required_time: i64,
    pub last_ping_timestamp: i64,
    pub history: Vec<HistoryEntry>,
}

impl Job {
    /// A freshly created job: `PENDING`, every timestamp zero, empty
    /// requester, no history.
    pub fn new_pending(id: i64, parameters: serde_json::Value) -> Self {
        Self {
            id,
            parameters,
            status: JobStatus::Pending,
            requested_by: String::new(),
            request_timestamp: 0,
            completion_timestamp: 0,
            required_time: 0,
            last_ping_timestamp: 0,
            history: Vec::new(),
        }
    }
}
