use serde::{Deserialize, Serialize};

/// Explicit database connection parameters sent with a job or a connection test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(rename = "dbHost")]
    pub host: String,
    #[serde(rename = "dbPort")]
    pub port: u16,
    #[serde(rename = "dbName")]
    pub name: String,
    #[serde(rename = "dbUser")]
    pub user: String,
    #[serde(rename = "dbPassword")]
    pub password: String,
}

/// Body of the start-job request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    pub tenant_ids: Vec<String>,
    pub to_schema: String,
    pub password: String,
    #[serde(flatten)]
    pub db: Option<DbConfig>,
}

impl BackupRequest {
    /// Download parameters for an archive produced by this request.
    pub fn download_for(&self, archive_id: impl Into<String>) -> DownloadRequest {
        DownloadRequest {
            archive_id: archive_id.into(),
            password: self.password.clone(),
            file_name: self.to_schema.clone(),
        }
    }
}

/// Operator input as typed into the form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackupForm {
    /// Comma separated tenant identifiers.
    pub tenant_ids: String,
    pub to_schema: String,
    pub password: String,
    pub db: Option<DbConfig>,
}

impl BackupForm {
    pub fn to_request(&self) -> BackupRequest {
        BackupRequest {
            tenant_ids: parse_tenant_ids(&self.tenant_ids),
            to_schema: self.to_schema.trim().to_string(),
            password: self.password.clone(),
            db: self.db.clone(),
        }
    }
}

fn parse_tenant_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Parameters of one archive retrieval; the archive is saved as `<file_name>.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub archive_id: String,
    pub password: String,
    pub file_name: String,
}

impl DownloadRequest {
    pub fn archive_file_name(&self) -> String {
        format!("{}.tar.gz", self.file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbTestStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbTestDatabase {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
}

/// Response of the connection test endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbTestResponse {
    pub status: DbTestStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub database: DbTestDatabase,
    pub timestamp: String,
}

impl DbTestResponse {
    pub fn is_success(&self) -> bool {
        self.status == DbTestStatus::Success
    }
}
