//! Optional RON configuration file for the monitor.
//!
//! Looked up at `./backup.ron` unless `--config` names another file. Every
//! field has a default, so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use backup_core::{BackupForm, DbConfig};
use backup_engine::ServiceSettings;
use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILENAME: &str = "backup.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub form: FormConfig,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub download_dir: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let defaults = ServiceSettings::default();
        Self {
            base_url: defaults.base_url,
            download_dir: defaults.download_dir,
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

impl ServiceConfig {
    pub fn to_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            download_dir: self.download_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub tenant_ids: String,
    pub to_schema: String,
    pub password: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            tenant_ids: "tenant1".to_string(),
            to_schema: "my_backup".to_string(),
            password: String::new(),
        }
    }
}

impl FormConfig {
    pub fn to_form(&self, db: Option<DbConfig>) -> BackupForm {
        BackupForm {
            tenant_ids: self.tenant_ids.clone(),
            to_schema: self.to_schema.clone(),
            password: self.password.clone(),
            db,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl From<DatabaseConfig> for DbConfig {
    fn from(db: DatabaseConfig) -> Self {
        DbConfig {
            host: db.host,
            port: db.port,
            name: db.name,
            user: db.user,
            password: db.password,
        }
    }
}

/// Loads the config file. A missing default file yields defaults; a missing
/// explicit file is an error.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
            return Ok(AppConfig::default());
        }
        Err(err) => {
            engine_warn!("Failed to read config from {:?}: {}", path, err);
            return Err(err).with_context(|| format!("reading config {}", path.display()));
        }
    };

    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}
