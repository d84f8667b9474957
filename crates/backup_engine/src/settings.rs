use std::path::PathBuf;
use std::time::Duration;

/// Where the backup service lives and how patient to be with it.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to connection tests and archive downloads; the job stream is
    /// open-ended and only bounded by `connect_timeout`.
    pub request_timeout: Duration,
    pub download_dir: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl ServiceSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
