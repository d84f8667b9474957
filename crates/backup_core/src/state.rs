use engine_logging::{engine_debug, engine_info};

use crate::classify;
use crate::view_model::SessionView;
use crate::{
    decode_line, BackupRequest, DownloadOrigin, Effect, FailedDownload, LineFramer,
    ProgressEvent, StreamEvent,
};

pub type SessionId = u64;

pub const STATUS_CONNECTING: &str = "Conectando...";
pub const STATUS_CONNECTED: &str = "Conectado - Backup em progresso";
pub const STATUS_CANCELLED: &str = "Backup cancelado pelo usuário";
pub const STATUS_DOWNLOAD_STARTING: &str = "Iniciando download...";
/// Message of the synthetic error event recorded on cancellation.
pub const CANCELLED_EVENT_MESSAGE: &str = "Processo de backup cancelado";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl SessionPhase {
    /// A stream consumer exists (or is being set up) for this phase.
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Connecting | SessionPhase::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Cancelled | SessionPhase::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved { path: String },
    Failed { message: String },
}

/// Everything derived from one backup run.
#[derive(Debug, Default)]
pub struct SessionState {
    session_id: SessionId,
    phase: SessionPhase,
    request: Option<BackupRequest>,
    events: Vec<StreamEvent>,
    latest_progress: Option<ProgressEvent>,
    status: String,
    failed_downloads: Vec<FailedDownload>,
    archive_id: Option<String>,
    download_triggered: bool,
    downloading: bool,
    last_download: Option<DownloadOutcome>,
    framer: LineFramer,
}

impl SessionState {
    pub(crate) fn connecting(session_id: SessionId, request: BackupRequest) -> Self {
        Self {
            session_id,
            phase: SessionPhase::Connecting,
            request: Some(request),
            status: STATUS_CONNECTING.to_string(),
            ..Self::default()
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn latest_progress(&self) -> Option<&ProgressEvent> {
        self.latest_progress.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn failed_downloads(&self) -> &[FailedDownload] {
        &self.failed_downloads
    }

    pub fn archive_id(&self) -> Option<&str> {
        self.archive_id.as_deref()
    }

    pub fn download_triggered(&self) -> bool {
        self.download_triggered
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn last_download(&self) -> Option<&DownloadOutcome> {
        self.last_download.as_ref()
    }

    pub fn request(&self) -> Option<&BackupRequest> {
        self.request.as_ref()
    }

    /// Explicit re-download is allowed once an archive id exists, outside `Connecting`.
    pub fn can_download(&self) -> bool {
        self.archive_id.is_some()
            && self.request.is_some()
            && self.phase != SessionPhase::Connecting
    }

    pub(crate) fn accepts(&self, session_id: SessionId) -> bool {
        self.session_id == session_id
    }

    pub(crate) fn mark_streaming(&mut self) {
        self.phase = SessionPhase::Streaming;
        self.status = STATUS_CONNECTED.to_string();
    }

    /// Runs a chunk through framer, decoder and classifier; returns the download
    /// effect if this chunk produced the first archive id.
    pub(crate) fn ingest_chunk(&mut self, chunk: &[u8]) -> Vec<Effect> {
        let lines = self.framer.feed(chunk);
        let mut effects = Vec::new();
        for line in lines {
            if let Some(event) = decode_line(&line) {
                effects.extend(self.apply_event(event));
            }
        }
        effects
    }

    /// Flushes the trailing fragment and completes the run.
    pub(crate) fn finish_stream(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(line) = self.framer.flush() {
            if let Some(event) = decode_line(&line) {
                effects.extend(self.apply_event(event));
            }
        }
        self.phase = SessionPhase::Completed;
        engine_info!(
            "Session {} completed: {} events, {} failed downloads, archive={:?}",
            self.session_id,
            self.events.len(),
            self.failed_downloads.len(),
            self.archive_id
        );
        effects
    }

    pub(crate) fn fail(&mut self, message: String, timestamp: String) {
        self.status = format!("Falha na conexão: {message}");
        self.events.push(StreamEvent::error(message, timestamp));
        self.phase = SessionPhase::Failed;
    }

    pub(crate) fn cancel(&mut self, timestamp: String) {
        self.status = STATUS_CANCELLED.to_string();
        self.events
            .push(StreamEvent::error(CANCELLED_EVENT_MESSAGE, timestamp));
        // Outcomes of downloads still in flight are discarded from here on.
        self.downloading = false;
        self.phase = SessionPhase::Cancelled;
    }

    pub(crate) fn request_manual_download(&mut self) -> Option<Effect> {
        if !self.can_download() {
            return None;
        }
        let archive_id = self.archive_id.clone()?;
        let request = self.request.as_ref()?.download_for(archive_id);
        self.downloading = true;
        Some(Effect::TriggerDownload {
            session_id: self.session_id,
            request,
            origin: DownloadOrigin::Manual,
        })
    }

    pub(crate) fn apply_download_result(&mut self, result: Result<String, String>) {
        self.downloading = false;
        let outcome = match result {
            Ok(path) => {
                self.status = format!("Download concluído: {path}");
                DownloadOutcome::Saved { path }
            }
            Err(message) => {
                self.status = format!("Falha no download: {message}");
                DownloadOutcome::Failed { message }
            }
        };
        self.last_download = Some(outcome);
    }

    fn apply_event(&mut self, event: StreamEvent) -> Option<Effect> {
        if let StreamEvent::Progress(progress) = &event {
            self.latest_progress = Some(progress.clone());
        }
        if let Some(status) = classify::status_message(&event) {
            self.status = status;
        }
        if let Some(failed) = classify::failed_download(&event) {
            engine_debug!(
                "Session {} recorded failed download {} ({})",
                self.session_id,
                failed.file_id,
                failed.path
            );
            self.failed_downloads.push(failed);
        }
        let archive_id = classify::archive_id(&event);
        self.events.push(event);

        let archive_id = archive_id?;
        if self.archive_id.is_some() {
            return None;
        }
        engine_info!("Session {} produced archive {}", self.session_id, archive_id);
        self.archive_id = Some(archive_id.clone());
        self.trigger_automatic_download(archive_id)
    }

    fn trigger_automatic_download(&mut self, archive_id: String) -> Option<Effect> {
        if self.download_triggered {
            return None;
        }
        let request = self.request.as_ref()?.download_for(archive_id);
        self.download_triggered = true;
        self.downloading = true;
        self.status = STATUS_DOWNLOAD_STARTING.to_string();
        Some(Effect::TriggerDownload {
            session_id: self.session_id,
            request,
            origin: DownloadOrigin::Automatic,
        })
    }
}

/// Top-level state owned by whoever runs [`crate::update`].
#[derive(Debug, Default)]
pub struct AppState {
    session: SessionState,
    last_session_id: SessionId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn view(&self) -> SessionView {
        SessionView::from_state(&self.session, self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub(crate) fn begin_session(&mut self, request: BackupRequest) -> SessionId {
        self.last_session_id += 1;
        let session_id = self.last_session_id;
        self.session = SessionState::connecting(session_id, request);
        self.dirty = true;
        session_id
    }

    pub(crate) fn clear_session(&mut self) {
        self.session = SessionState::default();
        self.dirty = true;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
