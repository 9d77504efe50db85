//! Client configuration, persisted as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::push::FileKeyStore;
use crate::webdav::WebDavConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DAV endpoint, e.g. "https://cloud.example.com/remote.php/dav".
    pub server_url: String,
    pub username: String,

    /// Listing root below the endpoint.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default)]
    pub push: PushKeys,
}

/// Locations of the push key material on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushKeys {
    /// PKCS#8 PEM device private key.
    pub private_key_path: PathBuf,
    /// SPKI PEM public key of the origin server.
    pub server_public_key_path: PathBuf,
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, content).with_context(|| format!("writing config file {}", path.display()))
    }

    /// Builds the WebDAV client configuration. The account password lives in
    /// the platform's secure storage, not in the config file, so it is passed
    /// in by the caller.
    pub fn webdav_config(&self, password: String) -> WebDavConfig {
        WebDavConfig {
            host: self.server_url.clone(),
            username: self.username.clone(),
            password,
            base_path: self.base_path.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            retry_attempts: self.retry_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn key_store(&self) -> FileKeyStore {
        FileKeyStore::new(
            self.push.private_key_path.clone(),
            self.push.server_public_key_path.clone(),
        )
    }
}
