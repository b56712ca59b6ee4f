//! Configuration management for tuberss.
//!
//! Configuration is read from `~/.config/tuberss/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The resulting [`Config`] is handed to the synchronizer and renderer
//! explicitly; nothing reads it from global state.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::time::is_valid_pattern;

pub const API_KEY_ENV: &str = "TUBERSS_API_KEY";
pub const MAX_RESULTS_LIMIT: usize = 50;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub format: FormatConfig,
    pub store: StoreConfig,
}

/// Upstream API access.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub key: String,
    pub endpoint: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Report upstream error JSON verbatim
    pub raw_errors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            endpoint: "https://www.googleapis.com/youtube/v3/".into(),
            timeout_secs: 10,
            raw_errors: false,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Videos kept per feed, also the playlist page size requested upstream
    pub results_limit: usize,
    /// Seconds a checked feed is served without contacting upstream
    pub max_age_secs: u64,
    /// Feeds refreshed concurrently by `update`
    pub workers: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            results_limit: 15,
            max_age_secs: 900,
            workers: 4,
        }
    }
}

/// Presentation settings shared by every output format.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub date_format: String,
    pub time_format: String,
    /// Embed through youtube-nocookie.com
    pub embed_privacy: bool,
    /// Base URL the feeds are served from; used for self and format links
    pub self_url: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            date_format: "%B %-d, %Y".into(),
            time_format: "%H:%M".into(),
            embed_privacy: false,
            self_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the default config file doesn't exist, creates one with comments.
    /// Missing fields in the config file use default values. The API key
    /// from the environment wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
                path: config_path.clone(),
                source: e,
            })?;

            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: config_path,
                source: e,
            })?
        } else {
            if path.is_none() {
                Self::create_default_config(&config_path)?;
            }
            Self::default()
        };

        let config = config.with_api_key_override(std::env::var(API_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/tuberss/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("tuberss").join("config.toml"))
    }

    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api.key = key.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.results_limit == 0 || self.feed.results_limit > MAX_RESULTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "feed.results_limit must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT, self.feed.results_limit
            )));
        }

        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("api.endpoint must not be empty".into()));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".into()));
        }

        for (name, pattern) in [
            ("format.date_format", &self.format.date_format),
            ("format.time_format", &self.format.time_format),
        ] {
            if !is_valid_pattern(pattern) {
                return Err(ConfigError::Invalid(format!(
                    "{} is not a valid strftime pattern: {}",
                    name, pattern
                )));
            }
        }

        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# tuberss configuration

[api]
# YouTube Data API key. The TUBERSS_API_KEY environment variable overrides it.
key = ""
endpoint = "https://www.googleapis.com/youtube/v3/"

# Timeout for each upstream call, in seconds
timeout_secs = 10

# Show the upstream error JSON verbatim instead of a summary
raw_errors = false

[feed]
# Videos kept per feed (1-50)
results_limit = 15

# Serve a feed from the store without contacting upstream if it was
# checked less than this many seconds ago
max_age_secs = 900

# Feeds refreshed concurrently by `tuberss update`
workers = 4

[format]
# strftime patterns
date_format = "%B %-d, %Y"
time_format = "%H:%M"

# Embed players from youtube-nocookie.com
embed_privacy = false

# Base URL the feeds are served from, e.g. "https://example.com/feed"
self_url = ""

[store]
# Database path (default: <data dir>/tuberss/tuberss.db)
# path = "/var/lib/tuberss/tuberss.db"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
