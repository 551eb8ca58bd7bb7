// src/config.rs

//! Runtime configuration.
//!
//! Values come from a JSON file (`$SCANWATCH_CONFIG`, or `config.json` in the project
//! config directory), then `SCANWATCH_*` environment overrides. A missing file is not an
//! error: every field has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::core::errors::ConfigError;
use crate::core::poller::PollPolicy;
use crate::logging;

pub const CONFIG_ENV: &str = "SCANWATCH_CONFIG";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8443,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub retry_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            retry_delay_ms: 2000,
            jitter_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub request_timeout_secs: Option<u64>,
    pub export_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads the configuration. An explicit `path` must exist; the implicit locations
    /// fall back to defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = logging::get_config_dir().join(CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "No config file, using defaults.");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        // Validate early so a bad host fails at startup, not on the first request.
        config.base_url()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies `SCANWATCH_*` overrides read through `lookup`. Unparseable numbers are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(protocol) = lookup("SCANWATCH_API_PROTOCOL") {
            self.api.protocol = protocol;
        }
        if let Some(host) = lookup("SCANWATCH_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = parsed(&lookup, "SCANWATCH_API_PORT") {
            self.api.port = port;
        }
        if let Some(ms) = parsed(&lookup, "SCANWATCH_POLL_INTERVAL_MS") {
            self.poll.interval_ms = ms;
        }
        if let Some(ms) = parsed(&lookup, "SCANWATCH_RETRY_DELAY_MS") {
            self.poll.retry_delay_ms = ms;
        }
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&format!(
            "{}://{}:{}/",
            self.api.protocol, self.api.host, self.api.port
        ))?;
        Ok(url)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::default()
            .with_interval(Duration::from_millis(self.poll.interval_ms))
            .with_retry_delay(Duration::from_millis(self.poll.retry_delay_ms))
            .with_jitter(Duration::from_millis(self.poll.jitter_ms))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| logging::get_data_dir().join("exports"))
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid numeric override.");
            None
        }
    }
}
