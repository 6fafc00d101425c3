//! Configuration management.
//!
//! Read from `~/.config/freshet/config.toml` at startup. If the file does
//! not exist, a commented default is written there. Missing fields fall back
//! to defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::media::cache::DEFAULT_MEMORY_ENTRIES;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub poller: PollerConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the remote feed API.
    pub base_url: String,
    /// Timeout applied to every network call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://feed.example.com/api/".into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Restrict the feed to a single author.
    pub owner: Option<String>,
    /// Database path; defaults to the platform data directory.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between new-content polls.
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Media cache directory; defaults to the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Bound on in-memory cached media bodies.
    pub memory_entries: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            memory_entries: DEFAULT_MEMORY_ENTRIES,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with
    /// comments. Missing fields in the file use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/freshet/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("freshet").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Freshet configuration

[api]
# Base URL of the remote feed API
base_url = "https://feed.example.com/api/"

# Timeout for every network call, in seconds
timeout_secs = 10

[feed]
# Restrict the feed to a single author
# owner = "someone"

# Database path (default: platform data directory)
# db_path = "/path/to/feed.db"

[poller]
# Seconds between new-content polls
interval_secs = 30

[media]
# Media cache directory (default: platform cache directory)
# cache_dir = "/path/to/cache"

# Bound on in-memory cached media bodies
memory_entries = 64
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.poller.interval_secs, 30);
        assert_eq!(config.media.memory_entries, DEFAULT_MEMORY_ENTRIES);
        assert!(config.feed.owner.is_none());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("[feed]\nowner = \"ada\"\n").unwrap();
        assert_eq!(config.feed.owner.as_deref(), Some("ada"));
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn test_default_content_parses() {
        let config: Config = toml::from_str(&Config::default_config_content()).unwrap();
        assert_eq!(config.media.memory_entries, 64);
        assert_eq!(config.poller.interval_secs, 30);
    }
}
