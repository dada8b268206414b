//! Persisted config (Ollama endpoint, models, chunking and retrieval limits) in the app data directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::chunks::{ChunkOptions, DEFAULT_CHUNK_SIZE};
use crate::embedder::{
    EmbedderOptions, DEFAULT_CONCURRENCY, DEFAULT_DIMENSION, DEFAULT_MAX_CHARS, DEFAULT_TIMEOUT,
};
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL};

const CONFIG_FILENAME: &str = "config.toml";

/// Passages handed to the model per question.
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama_url: String,
    pub embed_model: String,
    pub chat_model: String,
    /// Length of every embedding vector; must match the embed model.
    pub dimension: usize,
    /// Characters sent to the embed model per passage or query.
    pub max_embed_chars: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embed_timeout_secs: u64,
    pub embed_concurrency: usize,
    /// Prefix embedded text with nomic-style task prefixes.
    pub task_prefixes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_BASE_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            max_embed_chars: DEFAULT_MAX_CHARS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: 0,
            top_k: DEFAULT_TOP_K,
            embed_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            embed_concurrency: DEFAULT_CONCURRENCY,
            task_prefixes: true,
        }
    }
}

impl Config {
    pub fn embedder_options(&self) -> EmbedderOptions {
        EmbedderOptions {
            model: self.embed_model.clone(),
            dimension: self.dimension,
            max_chars: self.max_embed_chars,
            timeout: Duration::from_secs(self.embed_timeout_secs),
            concurrency: self.embed_concurrency,
        }
    }

    pub fn chunk_options(&self) -> ChunkOptions {
        ChunkOptions {
            chunk_size: self.chunk_size,
            overlap: self.chunk_overlap,
        }
    }
}

/// Path of the config file, if the app data directory can be determined.
pub fn config_path() -> Option<PathBuf> {
    app_data::app_data_dir().map(|d| d.join(CONFIG_FILENAME))
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    match load_config_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid config, using defaults");
            Config::default()
        }
    }
}

/// Load config from an explicit file. Missing keys take their defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&s).map_err(ConfigError::Parse)
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config: Config = toml::from_str("top_k = 3\nchat_model = \"mistral\"").unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.chat_model, "mistral");
        assert_eq!(config.dimension, 768);
        assert_eq!(config.max_embed_chars, 3000);
        assert_eq!(config.ollama_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn options_are_derived_from_config() {
        let config = Config {
            chunk_size: 200,
            chunk_overlap: 20,
            embed_timeout_secs: 7,
            ..Config::default()
        };
        assert_eq!(
            config.chunk_options(),
            ChunkOptions {
                chunk_size: 200,
                overlap: 20
            }
        );
        let e = config.embedder_options();
        assert_eq!(e.timeout, Duration::from_secs(7));
        assert_eq!(e.model, DEFAULT_EMBED_MODEL);
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let config = Config {
            embed_concurrency: 1,
            task_prefixes: false,
            ..Config::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "top_k = \"lots\"").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
