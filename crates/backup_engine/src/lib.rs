//! Backup engine: transport, archive persistence and the session driver.
mod controller;
mod download;
mod persist;
mod settings;
mod transport;
mod types;

pub use controller::{Clock, SessionController};
pub use download::{ArchiveDownloader, DownloadError};
pub use persist::{ensure_output_dir, AtomicFileWriter, PendingFile, PersistError};
pub use settings::ServiceSettings;
pub use transport::{ReqwestTransport, Transport};
pub use types::{ByteStream, FailureKind, SavedArchive, TransportError};
