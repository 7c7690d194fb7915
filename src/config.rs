//! User configuration (~/.rctrack/config.json)
//!
//! Precedence: command-line flag > `RCTRACK_API_URL` > config file > defaults.

use crate::services::chart::{ChartOptions, ViewRange};
use crate::types::{Result, RctrackError, ScaleThresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "RCTRACK_API_URL";

/// Default service address (local development server)
const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Thirty days of history, enough for the monthly view
const DEFAULT_HISTORY_HOURS: u32 = 720;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    /// Hours of cost history requested from the API
    pub history_hours: u32,
    pub default_range: ViewRange,
    /// Rolling-average window in days for weekly/monthly views
    pub smoothing_window: usize,
    pub request_timeout_secs: u64,
    pub scale: ScaleThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            history_hours: DEFAULT_HISTORY_HOURS,
            default_range: ViewRange::default(),
            smoothing_window: 1,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            scale: ScaleThresholds::default(),
        }
    }
}

impl Config {
    /// Directory holding config and the TUI log (~/.rctrack)
    pub fn config_dir() -> Result<PathBuf> {
        let home = directories::UserDirs::new()
            .ok_or_else(|| RctrackError::Config("Failed to get home directory".into()))?
            .home_dir()
            .to_path_buf();
        Ok(home.join(".rctrack"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, a missing default file
    /// yields defaults. The env override is applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_dir() {
                Ok(dir) if dir.join("config.json").exists() => {
                    Self::from_file(&dir.join("config.json"))?
                }
                Ok(_) => Self::default(),
                Err(e) => {
                    tracing::debug!(error = %e, "no config directory, using defaults");
                    Self::default()
                }
            },
        };

        let config = config.with_api_url_override(std::env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            RctrackError::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Replace the API URL when an override is present and non-empty
    pub fn with_api_url_override(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        self
    }

    /// Reject values the aggregator or HTTP client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.history_hours == 0 {
            return Err(RctrackError::Config("history_hours must be positive".into()));
        }
        if self.smoothing_window == 0 {
            return Err(RctrackError::Config(
                "smoothing_window must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(RctrackError::Config(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.scale.millions_above > self.scale.billions_above {
            return Err(RctrackError::Config(
                "scale.millions_above must not exceed scale.billions_above".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Chart options for a range, with the configured smoothing and scale
    pub fn chart_options(&self, range: ViewRange) -> ChartOptions {
        ChartOptions {
            range,
            smoothing_window: self.smoothing_window,
            thresholds: self.scale,
        }
    }
}
