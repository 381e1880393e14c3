//! Configuration for sending, receiving and verifying mentions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{MentionError, DEFAULT_ALLOWED_HOST, DEFAULT_REQUIRED_SCHEME, THUMBNAIL_SIZE};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host every accepted target must live on
    #[serde(default = "default_allowed_host")]
    pub allowed_host: String,

    /// Scheme every accepted target must use
    #[serde(default = "default_required_scheme")]
    pub required_scheme: String,

    /// Snapshot file backing the store
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Thumbnail derivation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Longer side of the resized photo (default: 32)
    #[serde(default = "default_thumbnail_size")]
    pub size: u32,
}

fn default_allowed_host() -> String {
    DEFAULT_ALLOWED_HOST.to_string()
}

fn default_required_scheme() -> String {
    DEFAULT_REQUIRED_SCHEME.to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("mentions.json")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("mention/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_thumbnail_size() -> u32 {
    THUMBNAIL_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_host: default_allowed_host(),
            required_scheme: default_required_scheme(),
            store_path: default_store_path(),
            http: HttpConfig::default(),
            thumbnail: ThumbnailConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: default_thumbnail_size(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Parse a TOML document; missing fields take their defaults
    pub fn from_toml(content: &str) -> Result<Self, MentionError> {
        toml::from_str(content).map_err(|e| MentionError::Parse(format!("config: {e}")))
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, MentionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MentionError::Io(format!("reading {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }
}
