use backup_core::{BackupRequest, DbConfig, DbTestResponse, DownloadRequest};
use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde_json::to_vec;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{ByteStream, FailureKind, ServiceSettings, TransportError};

/// Network side of a backup session.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Starts the job and returns its event feed once the service accepted it.
    async fn start_backup(
        &self,
        request: &BackupRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, TransportError>;

    async fn test_connection(&self, config: &DbConfig) -> Result<DbTestResponse, TransportError>;

    /// Streams the archive bytes for `request`.
    async fn fetch_archive(&self, request: &DownloadRequest) -> Result<ByteStream, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    settings: ServiceSettings,
}

impl ReqwestTransport {
    pub fn new(settings: ServiceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// URL the archive for `request` can be retrieved from.
    pub fn download_url(&self, request: &DownloadRequest) -> Result<Url, TransportError> {
        let mut url = self.endpoint(&["backup", "download", &request.archive_id])?;
        // Percent-encoded (`%20` for spaces), not form-encoded.
        let query = format!("password={}", urlencoding::encode(&request.password));
        url.set_query(Some(&query));
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.settings.base_url)
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::new(FailureKind::InvalidUrl, "base url cannot carry a path")
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Client for the open-ended job stream: bounded on connect only.
    fn stream_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
    }

    fn request_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn start_backup(
        &self,
        request: &BackupRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, TransportError> {
        let url = self.endpoint(&["backup"])?;
        let body = to_vec(request)
            .map_err(|err| TransportError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let client = self.stream_client()?;

        engine_info!("POST {} for schema {}", url, request.to_schema);
        let send = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(TransportError::new(FailureKind::Cancelled, "start request cancelled"));
            }
            response = send => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(status.as_u16()));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(Box::pin(stream))
    }

    async fn test_connection(&self, config: &DbConfig) -> Result<DbTestResponse, TransportError> {
        let url = self.endpoint(&["test-db"])?;
        let body = to_vec(config)
            .map_err(|err| TransportError::new(FailureKind::InvalidRequest, err.to_string()))?;

        engine_info!("POST {} for {}:{}/{}", url, config.host, config.port, config.name);
        let response = self
            .request_client()?
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| TransportError::new(FailureKind::InvalidResponse, err.to_string()))
    }

    async fn fetch_archive(&self, request: &DownloadRequest) -> Result<ByteStream, TransportError> {
        let url = self.download_url(request)?;
        engine_debug!("GET archive {}", request.archive_id);
        let response = self
            .request_client()?
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(status.as_u16()));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(Box::pin(stream))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
