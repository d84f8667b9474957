use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of the backup job's event feed, selected by the JSON `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Log(LogEvent),
    Progress(ProgressEvent),
    Complete(CompleteEvent),
    Error(ErrorEvent),
}

impl StreamEvent {
    pub fn timestamp(&self) -> &str {
        match self {
            StreamEvent::Log(event) => &event.timestamp,
            StreamEvent::Progress(event) => &event.timestamp,
            StreamEvent::Complete(event) => &event.timestamp,
            StreamEvent::Error(event) => &event.timestamp,
        }
    }

    /// Builds a locally produced error event (cancellation, transport faults).
    pub fn error(message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        StreamEvent::Error(ErrorEvent {
            message: message.into(),
            timestamp: timestamp.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
    Success,
    Progress,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: String,
    /// Free-form payload attached by the job; carried but never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStep {
    Init,
    Sql,
    Query,
    Download,
    Dump,
    Archive,
}

impl ProgressStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStep::Init => "init",
            ProgressStep::Sql => "sql",
            ProgressStep::Query => "query",
            ProgressStep::Download => "download",
            ProgressStep::Dump => "dump",
            ProgressStep::Archive => "archive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub step: ProgressStep,
    pub current: u64,
    pub total: u64,
    pub message: String,
    pub timestamp: String,
}

impl ProgressEvent {
    pub fn ratio(&self) -> ProgressRatio {
        ProgressRatio {
            current: self.current,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteEvent {
    pub success: bool,
    pub summary: CompleteSummary,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSummary {
    pub schema: String,
    pub total_files: u64,
    pub successful_downloads: u64,
    pub failed_downloads: u64,
    /// Job duration as reported by the service.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    pub timestamp: String,
}

/// A file the job failed to fetch, recovered from an error-level log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub file_id: String,
    pub path: String,
    pub timestamp: String,
}

/// Step counters of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRatio {
    pub current: u64,
    pub total: u64,
}
