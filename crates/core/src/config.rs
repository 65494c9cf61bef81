//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Chunk size handed to clients at init, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Maximum accepted declared file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Sessions idle longer than this are reaped, in seconds.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Reaper scan interval in seconds.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
    /// Enable the /metrics endpoint for Prometheus scraping.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_chunk_size() -> u64 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_max_file_size() -> u64 {
    crate::DEFAULT_MAX_FILE_SIZE
}

fn default_stale_after_secs() -> u64 {
    1800 // 30 minutes
}

fn default_reap_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            chunk_size: default_chunk_size(),
            max_file_size: default_max_file_size(),
            stale_after_secs: default_stale_after_secs(),
            reap_interval_secs: default_reap_interval_secs(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Staleness timeout as a Duration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Reaper interval as a Duration.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage rooted at `path`.
    Filesystem { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("data"),
        }
    }
}

/// Outbound publish configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Chunk size for the resumable-PUT protocol, in bytes. Must be a
    /// 256 KiB multiple per the platform's documentation.
    #[serde(default = "default_youtube_chunk_size")]
    pub youtube_chunk_size: u64,
    /// Chunk size for APPEND segments, in bytes.
    #[serde(default = "default_twitter_chunk_size")]
    pub twitter_chunk_size: u64,
    /// API base URL overrides, used by tests to point adapters at fakes.
    #[serde(default)]
    pub youtube_api_base: Option<String>,
    #[serde(default)]
    pub twitter_api_base: Option<String>,
    #[serde(default)]
    pub tiktok_api_base: Option<String>,
}

fn default_youtube_chunk_size() -> u64 {
    256 * 1024 * 1024
}

fn default_twitter_chunk_size() -> u64 {
    5 * 1024 * 1024
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            youtube_chunk_size: default_youtube_chunk_size(),
            twitter_chunk_size: default_twitter_chunk_size(),
            youtube_api_base: None,
            twitter_api_base: None,
            tiktok_api_base: None,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl AppConfig {
    /// Validate configuration at startup. Returns human-readable problems.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.chunk_size == 0 {
            return Err("server.chunk_size must be nonzero".to_string());
        }
        if self.server.max_file_size < self.server.chunk_size {
            return Err(format!(
                "server.max_file_size ({}) is smaller than server.chunk_size ({})",
                self.server.max_file_size, self.server.chunk_size
            ));
        }
        if self.server.stale_after_secs == 0 {
            return Err("server.stale_after_secs must be nonzero".to_string());
        }
        if self.server.reap_interval_secs == 0 {
            return Err("server.reap_interval_secs must be nonzero".to_string());
        }
        if self.publish.youtube_chunk_size % (256 * 1024) != 0 {
            return Err("publish.youtube_chunk_size must be a 256 KiB multiple".to_string());
        }
        Ok(())
    }

    /// Create a test configuration with a small chunk size.
    ///
    /// **For testing only.** Storage points at a relative path the test is
    /// expected to override.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                chunk_size: 1024,
                max_file_size: 64 * 1024 * 1024,
                ..Default::default()
            },
            storage: StorageConfig::Filesystem {
                path: PathBuf::from("test-data"),
            },
            publish: PublishConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        AppConfig::default().validate().unwrap();
        AppConfig::for_testing().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = AppConfig::default();
        config.server.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_max_below_chunk() {
        let mut config = AppConfig::default();
        config.server.max_file_size = config.server.chunk_size - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unaligned_put_chunk() {
        let mut config = AppConfig::default();
        config.publish.youtube_chunk_size = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_config_toml_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        match parsed.storage {
            StorageConfig::Filesystem { path } => assert_eq!(path, PathBuf::from("data")),
        }
    }
}
