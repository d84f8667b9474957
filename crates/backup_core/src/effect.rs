use crate::{BackupRequest, DownloadRequest, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue the start-job request and pump its body back as `ChunkReceived`.
    OpenStream {
        session_id: SessionId,
        request: BackupRequest,
    },
    /// Stop consuming the stream of `session_id`.
    CancelStream { session_id: SessionId },
    /// Fetch the archive; fire-and-forget, reported back as `DownloadFinished`.
    TriggerDownload {
        session_id: SessionId,
        request: DownloadRequest,
        origin: DownloadOrigin,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOrigin {
    /// First archive id seen in the stream.
    Automatic,
    /// Operator asked again.
    Manual,
}
