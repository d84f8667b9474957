use crate::classify::progress_percentage;
use crate::state::SessionState;
use crate::{DownloadOutcome, FailedDownload, ProgressEvent, SessionId, SessionPhase, StreamEvent};

/// Snapshot of a session for rendering; consistent as of the last applied message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    pub status: String,
    pub events: Vec<StreamEvent>,
    pub latest_progress: Option<ProgressEvent>,
    pub progress_percent: Option<f64>,
    pub failed_downloads: Vec<FailedDownload>,
    pub archive_id: Option<String>,
    pub download_triggered: bool,
    pub downloading: bool,
    pub last_download: Option<DownloadOutcome>,
    pub can_start: bool,
    pub can_cancel: bool,
    pub can_download: bool,
    pub dirty: bool,
}

impl SessionView {
    pub(crate) fn from_state(session: &SessionState, dirty: bool) -> Self {
        let latest_progress = session.latest_progress().cloned();
        let progress_percent = latest_progress
            .as_ref()
            .map(|progress| progress_percentage(progress.ratio()));
        Self {
            session_id: session.session_id(),
            phase: session.phase(),
            status: session.status().to_string(),
            events: session.events().to_vec(),
            latest_progress,
            progress_percent,
            failed_downloads: session.failed_downloads().to_vec(),
            archive_id: session.archive_id().map(ToOwned::to_owned),
            download_triggered: session.download_triggered(),
            downloading: session.is_downloading(),
            last_download: session.last_download().cloned(),
            can_start: !session.phase().is_active(),
            can_cancel: session.phase().is_active(),
            can_download: session.can_download() && !session.is_downloading(),
            dirty,
        }
    }
}
