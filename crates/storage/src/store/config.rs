#![forbid(unsafe_code)]

use super::StoreError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_STORAGE_DIR: &str = "PERSONAL_CLOUD_STORAGE_DIR";
const ENV_BUSY_TIMEOUT_MS: &str = "PERSONAL_CLOUD_BUSY_TIMEOUT_MS";
const ENV_DOWNLOAD_LIMIT: &str = "PERSONAL_CLOUD_DOWNLOAD_LIMIT";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub storage_dir: PathBuf,
    pub db_file_name: String,
    pub busy_timeout_ms: u64,
    /// Entries scanned per download when the request does not set a limit.
    pub download_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".personal_cloud"),
            db_file_name: "personal_cloud.db".to_string(),
            busy_timeout_ms: 5_000,
            download_limit: 1_000,
        }
    }
}

impl StoreConfig {
    pub fn with_storage_dir(mut self, storage_dir: impl AsRef<Path>) -> Self {
        self.storage_dir = storage_dir.as_ref().to_path_buf();
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(&self.db_file_name)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Defaults overlaid with `PERSONAL_CLOUD_*` environment variables.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, StoreError> {
        toml::from_str(raw).map_err(|err| StoreError::Config(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Applies overrides from `lookup`; absent or blank values keep the current setting.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(dir) = read(ENV_STORAGE_DIR) {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = raw.parse().map_err(|_| {
                StoreError::Config(format!("{ENV_BUSY_TIMEOUT_MS} must be an integer"))
            })?;
        }
        if let Some(raw) = read(ENV_DOWNLOAD_LIMIT) {
            let limit: usize = raw.parse().map_err(|_| {
                StoreError::Config(format!("{ENV_DOWNLOAD_LIMIT} must be an integer"))
            })?;
            if limit == 0 {
                return Err(StoreError::Config(format!("{ENV_DOWNLOAD_LIMIT} must be positive")));
            }
            self.download_limit = limit;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_reads_known_keys_only() {
        let config = StoreConfig::default()
            .overlay(|key| match key {
                ENV_STORAGE_DIR => Some("/tmp/pc".to_string()),
                ENV_DOWNLOAD_LIMIT => Some(" 25 ".to_string()),
                ENV_BUSY_TIMEOUT_MS => Some(String::new()),
                _ => None,
            })
            .expect("overlay");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/pc"));
        assert_eq!(config.download_limit, 25);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn overlay_rejects_bad_numbers() {
        let err = StoreConfig::default()
            .overlay(|key| (key == ENV_DOWNLOAD_LIMIT).then(|| "0".to_string()))
            .expect_err("zero limit");
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = StoreConfig::from_toml_str("download_limit = 10\n").expect("parse toml");
        assert_eq!(config.download_limit, 10);
        assert_eq!(config.db_file_name, "personal_cloud.db");
        assert!(StoreConfig::from_toml_str("unknown = 1\n").is_err());
    }
}
