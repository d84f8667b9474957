//! Pure derivations over a single [`StreamEvent`].
use std::sync::LazyLock;

use regex::Regex;

use crate::{FailedDownload, LogLevel, ProgressRatio, StreamEvent};

/// Status shown once the job reports completion.
pub const STATUS_COMPLETE: &str = "Backup concluído com sucesso";

/// Marker the job writes into a log line when the archive has been produced.
pub const ARCHIVE_ID_MARKER: &str = "Archive ID:";

// Ids are ASCII letters, digits, `_` and `-`.
static ARCHIVE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Archive ID: ([A-Za-z0-9_-]+)").expect("archive id pattern"));

static FAILED_DOWNLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Failed to download file ([A-Za-z0-9_-]+) \$\$(.*?)\$\$").expect("failed download pattern")
});

/// Human-readable status line for the event, or `None` if it should not replace
/// the current status.
pub fn status_message(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::Progress(progress) => Some(format!(
            "{}: {}",
            progress.step.as_str().to_uppercase(),
            progress.message
        )),
        StreamEvent::Log(log) if log.level == LogLevel::Info => Some(log.message.clone()),
        StreamEvent::Log(_) => None,
        StreamEvent::Complete(_) => Some(STATUS_COMPLETE.to_string()),
        StreamEvent::Error(error) => Some(format!("Erro: {}", error.message)),
    }
}

pub fn progress_ratio(event: &StreamEvent) -> Option<ProgressRatio> {
    match event {
        StreamEvent::Progress(progress) => Some(progress.ratio()),
        _ => None,
    }
}

/// Percentage in `[0, 100]` for well-formed ratios; `0` when `total` is zero.
pub fn progress_percentage(ratio: ProgressRatio) -> f64 {
    if ratio.total > 0 {
        ratio.current as f64 / ratio.total as f64 * 100.0
    } else {
        0.0
    }
}

pub fn failed_download(event: &StreamEvent) -> Option<FailedDownload> {
    let StreamEvent::Log(log) = event else {
        return None;
    };
    if log.level != LogLevel::Error {
        return None;
    }
    let captures = FAILED_DOWNLOAD_RE.captures(&log.message)?;
    let file_id = captures.get(1)?;
    let path = captures.get(2)?;
    Some(FailedDownload {
        file_id: file_id.as_str().to_string(),
        path: path.as_str().to_string(),
        timestamp: log.timestamp.clone(),
    })
}

/// Archive identifier carried by the event, from a log marker or a completion summary.
pub fn archive_id(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::Log(log) if log.message.contains(ARCHIVE_ID_MARKER) => ARCHIVE_ID_RE
            .captures(&log.message)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string()),
        StreamEvent::Complete(complete) => complete
            .summary
            .archive_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned),
        _ => None,
    }
}

pub fn is_complete(event: &StreamEvent) -> bool {
    matches!(event, StreamEvent::Complete(_))
}

pub fn is_error(event: &StreamEvent) -> bool {
    matches!(event, StreamEvent::Error(_))
}
