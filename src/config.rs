//! Configuration management for docqa
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.docqa/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{QaError, Result};
use crate::rag::prompt::ContextBoundary;

/// Complete configuration for docqa
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub retrieval: RetrievalConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub links: LinksConfig,
    pub retry: RetryConfig,
    pub telemetry: TelemetryConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub completion_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

/// Retrieval and prompt assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub context_boundary: ContextBoundary,
}

/// Which document store implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Qdrant,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Snapshot file for the memory backend
    pub path: String,
    pub qdrant_url: String,
    pub collection: String,
}

/// Chunking and embedding batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

/// Placeholder key shipped in the default config
pub const DEFAULT_SIGNING_KEY: &str = "change-me";

/// Presigned source link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub base_url: String,
    pub expiry_secs: i64,
    pub signing_key: String,
}

/// Retry policy for external calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            completion_model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            context_boundary: ContextBoundary::Inclusive,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: "~/.docqa/store.json".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "docs_chunks".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            batch_size: 16,
        }
    }
}

impl LinksConfig {
    /// Links signed with the shipped key can be forged by anyone
    pub fn uses_default_key(&self) -> bool {
        self.signing_key == DEFAULT_SIGNING_KEY
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/documents".to_string(),
            expiry_secs: 360,
            signing_key: DEFAULT_SIGNING_KEY.to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QaError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| QaError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.docqa/config.toml when present, otherwise built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".docqa").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(QaError::ConfigError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }

        if self.ingest.chunk_size == 0 {
            return Err(QaError::ConfigError(
                "ingest.chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(QaError::ConfigError(
                "ingest.chunk_overlap must be less than ingest.chunk_size".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 {
            return Err(QaError::ConfigError(
                "ingest.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.links.expiry_secs <= 0 {
            return Err(QaError::ConfigError(
                "links.expiry_secs must be positive".to_string(),
            ));
        }

        if self.links.signing_key.is_empty() {
            return Err(QaError::ConfigError(
                "links.signing_key must not be empty".to_string(),
            ));
        }

        if self.ollama.completion_model.trim().is_empty()
            || self.ollama.embedding_model.trim().is_empty()
        {
            return Err(QaError::ConfigError(
                "ollama model names must not be empty".to_string(),
            ));
        }

        match self.telemetry.default_verbosity.as_str() {
            "quiet" | "normal" | "verbose" | "very_verbose" => {}
            other => {
                return Err(QaError::ConfigError(format!(
                    "Invalid verbosity level: {}",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| QaError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                QaError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| QaError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Memory store snapshot path
    pub fn store_path(&self) -> PathBuf {
        Self::expand_path(&self.store.path)
    }

    /// REPL history file, next to the config file
    pub fn history_path(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".docqa").join("history"))
    }
}
