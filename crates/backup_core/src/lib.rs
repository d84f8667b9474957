//! Backup core: event-stream pipeline and pure session state machine.
pub mod classify;
mod decode;
mod effect;
mod event;
mod framing;
mod msg;
mod request;
mod state;
mod update;
mod view_model;

pub use classify::{
    archive_id, failed_download, is_complete, is_error, progress_percentage, progress_ratio,
    status_message, STATUS_COMPLETE,
};
pub use decode::{decode_line, try_decode_line, DecodeError, DATA_PREFIX, EVENT_PREFIX};
pub use effect::{DownloadOrigin, Effect};
pub use event::{
    CompleteEvent, CompleteSummary, ErrorEvent, FailedDownload, LogEvent, LogLevel,
    ProgressEvent, ProgressRatio, ProgressStep, StreamEvent,
};
pub use framing::LineFramer;
pub use msg::Msg;
pub use request::{
    BackupForm, BackupRequest, DbConfig, DbTestDatabase, DbTestResponse, DbTestStatus,
    DownloadRequest,
};
pub use state::{
    AppState, DownloadOutcome, SessionId, SessionPhase, SessionState, CANCELLED_EVENT_MESSAGE,
    STATUS_CANCELLED, STATUS_CONNECTED, STATUS_CONNECTING, STATUS_DOWNLOAD_STARTING,
};
pub use update::update;
pub use view_model::SessionView;
