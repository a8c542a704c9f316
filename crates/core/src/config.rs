//! Configuration types shared across crates.

use crate::hash::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted chunk body in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
    /// Per-request timeout in seconds. Merges of large files must fit in it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Allow cross-origin requests from any origin (browser uploaders).
    #[serde(default = "default_cors_permissive")]
    pub cors_permissive: bool,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_chunk_size() -> u64 {
    crate::MAX_CHUNK_SIZE
}

fn default_request_timeout_secs() -> u64 {
    300 // 5 minutes
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_cors_permissive() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_chunk_size: default_max_chunk_size(),
            request_timeout_secs: default_request_timeout_secs(),
            metrics_enabled: default_metrics_enabled(),
            cors_permissive: default_cors_permissive(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate server configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("server.max_chunk_size must be greater than 0".to_string());
        }
        if usize::try_from(self.max_chunk_size).is_err() {
            return Err(format!(
                "server.max_chunk_size {} exceeds platform address space",
                self.max_chunk_size
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("server.request_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory holding chunk namespaces and merged artifacts.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/upload"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Filesystem { path } if path.as_os_str().is_empty() => {
                Err("storage.path must not be empty".to_string())
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Complete server application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create a test configuration rooted at `path`.
    ///
    /// **For testing only.** Metrics stay enabled; everything else is default.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Filesystem { path: path.into() },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.storage.validate()
    }
}

/// Retry behaviour for client requests.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per request, including the first (1 disables retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for a single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Client (`splicectl`) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the splice server.
    #[serde(default = "default_server")]
    pub server: String,
    /// Chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Fingerprint sample window in bytes.
    #[serde(default = "default_sample_window")]
    pub sample_window: u64,
    /// Fingerprint digest.
    #[serde(default)]
    pub algorithm: DigestAlgorithm,
    /// Per-request timeout in seconds.
    #[serde(default = "default_client_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Concurrent chunk uploads (1 = strictly sequential).
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Treat a failed resume query as "nothing uploaded yet".
    #[serde(default)]
    pub degrade_on_lookup_error: bool,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_server() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_chunk_size() -> u64 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_sample_window() -> u64 {
    crate::DEFAULT_SAMPLE_WINDOW
}

fn default_client_timeout_secs() -> u64 {
    60
}

fn default_parallelism() -> usize {
    1
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            chunk_size: default_chunk_size(),
            sample_window: default_sample_window(),
            algorithm: DigestAlgorithm::default(),
            request_timeout_secs: default_client_timeout_secs(),
            parallelism: default_parallelism(),
            degrade_on_lookup_error: false,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate client configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(crate::MIN_CHUNK_SIZE..=crate::MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(crate::Error::InvalidChunkSize {
                size: self.chunk_size,
                min: crate::MIN_CHUNK_SIZE,
                max: crate::MAX_CHUNK_SIZE,
            }
            .to_string());
        }
        if self.sample_window == 0 {
            return Err("sample_window must be greater than 0".to_string());
        }
        if self.parallelism == 0 {
            return Err("parallelism must be at least 1".to_string());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }
}
