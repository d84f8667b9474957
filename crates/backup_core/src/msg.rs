use crate::{BackupRequest, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator asked for a new backup run; any active run is cancelled first.
    StartRequested(BackupRequest),
    /// The service accepted the job and its event stream is readable.
    StreamOpened { session_id: SessionId },
    /// Next raw chunk of the event stream, in arrival order.
    ChunkReceived {
        session_id: SessionId,
        chunk: Vec<u8>,
    },
    /// The service closed the stream without a transport error.
    StreamEnded { session_id: SessionId },
    /// Transport or pipeline fault while connecting or streaming.
    StreamFailed {
        session_id: SessionId,
        message: String,
        timestamp: String,
    },
    /// Operator cancelled the active run.
    CancelRequested { timestamp: String },
    /// Operator explicitly asked to (re-)download the recorded archive.
    DownloadRequested,
    /// Outcome of a download started by a `TriggerDownload` effect.
    DownloadFinished {
        session_id: SessionId,
        result: Result<String, String>,
    },
    /// The presentation layer went away; drop everything.
    Reset,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
