use std::path::PathBuf;
use std::sync::Arc;

use backup_core::DownloadRequest;
use engine_logging::engine_info;
use futures_util::StreamExt;

use crate::persist::{AtomicFileWriter, PersistError};
use crate::{SavedArchive, Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("could not save archive: {0}")]
    Persist(#[from] PersistError),
}

/// Fetches produced archives and saves them as `<schema>.tar.gz`.
#[derive(Clone)]
pub struct ArchiveDownloader {
    transport: Arc<dyn Transport>,
    writer: Arc<AtomicFileWriter>,
}

impl ArchiveDownloader {
    pub fn new(transport: Arc<dyn Transport>, download_dir: PathBuf) -> Self {
        Self {
            transport,
            writer: Arc::new(AtomicFileWriter::new(download_dir)),
        }
    }

    pub async fn download(&self, request: &DownloadRequest) -> Result<SavedArchive, DownloadError> {
        let mut stream = self.transport.fetch_archive(request).await?;
        let mut pending = self.writer.begin(&request.archive_file_name())?;
        while let Some(chunk) = stream.next().await {
            pending.write_chunk(&chunk?)?;
        }
        let byte_len = pending.written();
        let path = pending.commit()?;
        engine_info!(
            "Saved archive {} ({} bytes) to {:?}",
            request.archive_id,
            byte_len,
            path
        );
        Ok(SavedArchive { path, byte_len })
    }
}
