use std::io::{self, Write};

use backup_core::{
    is_complete, is_error, DownloadOutcome, LogLevel, SessionId, SessionPhase, SessionView,
    StreamEvent,
};
use chrono::{DateTime, Local};

const BAR_WIDTH: usize = 30;

/// Prints only what changed between successive session snapshots.
pub struct TerminalRenderer<W: Write> {
    out: W,
    session_id: SessionId,
    printed_events: usize,
    last_status: String,
    last_progress: Option<(u64, u64)>,
    summary_printed: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            session_id: 0,
            printed_events: 0,
            last_status: String::new(),
            last_progress: None,
            summary_printed: false,
        }
    }

    pub fn render(&mut self, view: &SessionView) -> io::Result<()> {
        for line in self.lines(view) {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }

    pub fn lines(&mut self, view: &SessionView) -> Vec<String> {
        if view.session_id != self.session_id {
            self.session_id = view.session_id;
            self.printed_events = 0;
            self.last_status.clear();
            self.last_progress = None;
            self.summary_printed = false;
        }

        let mut lines = Vec::new();
        for event in view.events.iter().skip(self.printed_events) {
            lines.push(event_line(event));
        }
        self.printed_events = view.events.len();

        if let Some(progress) = &view.latest_progress {
            let key = (progress.current, progress.total);
            if self.last_progress != Some(key) {
                self.last_progress = Some(key);
                lines.push(progress_bar(view.progress_percent.unwrap_or(0.0)));
            }
        }

        if view.status != self.last_status {
            self.last_status = view.status.clone();
            if !view.status.is_empty() {
                lines.push(format!(">> {}", view.status));
            }
        }

        if view.phase.is_terminal() && !view.downloading && !self.summary_printed {
            self.summary_printed = true;
            lines.extend(summary_lines(view));
        }
        lines
    }
}

/// Local wall-clock time of an ISO-8601 instant; the raw text if it does not parse.
pub fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(instant) => instant.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn event_line(event: &StreamEvent) -> String {
    let text = match event {
        StreamEvent::Log(log) => format!("{:<5} {}", level_tag(log.level), log.message),
        StreamEvent::Progress(progress) => format!(
            "STEP  {} {}/{} {}",
            progress.step.as_str().to_uppercase(),
            progress.current,
            progress.total,
            progress.message
        ),
        StreamEvent::Complete(complete) => {
            let summary = &complete.summary;
            let mut text = format!(
                "{:<5} schema {}: {} files, {} downloaded, {} failed in {}",
                if complete.success { "DONE" } else { "FAIL" },
                summary.schema,
                summary.total_files,
                summary.successful_downloads,
                summary.failed_downloads,
                summary.duration
            );
            if let Some(size) = summary.archive_size {
                text.push_str(&format!(", archive {size} bytes"));
            }
            text
        }
        StreamEvent::Error(error) => format!("ERROR {}", error.message),
    };
    let marker = if is_error(event) {
        "x"
    } else if is_complete(event) {
        "*"
    } else {
        " "
    };
    format!("[{}] {} {}", format_timestamp(event.timestamp()), marker, text)
}

fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Error => "ERROR",
        LogLevel::Success => "OK",
        LogLevel::Progress => "PROG",
        LogLevel::Warning => "WARN",
    }
}

fn progress_bar(percent: f64) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>5.1}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

fn summary_lines(view: &SessionView) -> Vec<String> {
    let mut lines = Vec::new();
    let outcome = match view.phase {
        SessionPhase::Completed => "completed",
        SessionPhase::Cancelled => "cancelled",
        SessionPhase::Failed => "failed",
        SessionPhase::Idle | SessionPhase::Connecting | SessionPhase::Streaming => "running",
    };
    lines.push(format!("Session {} {}", view.session_id, outcome));
    if !view.failed_downloads.is_empty() {
        lines.push(format!("{} file(s) failed to download:", view.failed_downloads.len()));
        for failed in &view.failed_downloads {
            lines.push(format!(
                "  {} {} ({})",
                failed.file_id,
                failed.path,
                format_timestamp(&failed.timestamp)
            ));
        }
    }
    if let Some(archive_id) = &view.archive_id {
        lines.push(format!("Archive ID: {archive_id}"));
    }
    match &view.last_download {
        Some(DownloadOutcome::Saved { path }) => lines.push(format!("Saved to {path}")),
        Some(DownloadOutcome::Failed { message }) => {
            lines.push(format!("Download failed: {message}"))
        }
        None => {}
    }
    lines
}
