//! Persistent configuration.
//!
//! Stored in `~/.swipeseek/config.json`. Every field has a default, so a
//! partial or missing file is fine.
//!
//! ```no_run
//! use swipeseek_core::config::SeekConfig;
//!
//! let config = SeekConfig::load();
//! println!("agent at {}:{}", config.agent_host, config.agent_port);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::DriverConfig;
use crate::search::{
    SearchConfig, DEFAULT_FIND_TIMEOUT, DEFAULT_GESTURE_DURATION, DEFAULT_GESTURE_SPAN,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY,
};

const CONFIG_FILENAME: &str = "config.json";

/// Default agent port.
pub const DEFAULT_AGENT_PORT: u16 = 9800;

/// Returns `~/.swipeseek`, falling back to the current directory when no
/// home directory is known.
pub fn swipeseek_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".swipeseek")
}

/// Persistent swipeseek configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    pub agent_host: String,
    pub agent_port: u16,
    pub settle_delay_ms: u64,
    pub gesture_duration_ms: u64,
    /// Stroke length as a fraction of the container span.
    pub gesture_span: f64,
    /// `null` removes the iteration cap.
    pub max_attempts: Option<u32>,
    pub find_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            agent_host: "localhost".to_string(),
            agent_port: DEFAULT_AGENT_PORT,
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            gesture_duration_ms: DEFAULT_GESTURE_DURATION.as_millis() as u64,
            gesture_span: DEFAULT_GESTURE_SPAN,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            find_timeout_ms: DEFAULT_FIND_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl SeekConfig {
    /// Path of the config file.
    pub fn path() -> PathBuf {
        swipeseek_dir().join(CONFIG_FILENAME)
    }

    /// Loads `~/.swipeseek/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Loads from `path`, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                debug!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Saves to `~/.swipeseek/config.json`, creating the directory.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    /// Saves to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Search timing derived from this config.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            gesture_duration: Duration::from_millis(self.gesture_duration_ms),
            gesture_span: self.gesture_span,
            max_attempts: self.max_attempts,
            find_timeout: Duration::from_millis(self.find_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Agent address derived from this config.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            host: self.agent_host.clone(),
            port: self.agent_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("swipeseek-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn defaults_match_search_defaults() {
        let config = SeekConfig::default();
        assert_eq!(config.search_config(), SearchConfig::default());
        assert_eq!(config.driver_config().port, DEFAULT_AGENT_PORT);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SeekConfig =
            serde_json::from_str(r#"{"agent_port": 1234, "max_attempts": null}"#).unwrap();
        assert_eq!(config.agent_port, 1234);
        assert_eq!(config.agent_host, "localhost");
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.search_config().max_attempts, None);
    }

    #[test]
    fn save_then_load() {
        let path = temp_path(CONFIG_FILENAME);
        let config = SeekConfig {
            settle_delay_ms: 250,
            ..SeekConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(SeekConfig::load_from(&path), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_or_invalid_file_gives_defaults() {
        let path = temp_path("missing.json");
        assert_eq!(SeekConfig::load_from(&path), SeekConfig::default());

        let path = temp_path("bad.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(SeekConfig::load_from(&path), SeekConfig::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
