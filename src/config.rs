use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    pub poll_interval_ms: u64,
    pub await_timeout_ms: u64,
    /// Extracted text must be strictly longer than this to count as content.
    pub min_content_len: usize,
    pub element_timeout_ms: u64,
    pub element_poll_ms: u64,
    pub settle_delay_ms: u64,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            await_timeout_ms: 30_000,
            min_content_len: 5,
            element_timeout_ms: 3_000,
            element_poll_ms: 200,
            settle_delay_ms: 200,
            database_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl ConductorConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("conductor").join("config.json"))
    }

    /// Load from `path`, or the default location when `None`. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("conductor").join("conductor.db")))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_millis(self.await_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn element_poll(&self) -> Duration {
        Duration::from_millis(self.element_poll_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Upper bound a worker spends on one submit: two element searches, the
    /// settle delay, and one spare poll.
    pub fn submit_timeout(&self) -> Duration {
        self.element_timeout() * 2 + self.settle_delay() + self.element_poll()
    }

    /// Upper bound the coordinator waits for a submit round-trip. One poll
    /// longer than the worker's own bound.
    pub fn submit_guard(&self) -> Duration {
        self.submit_timeout() + self.element_poll()
    }

    /// Upper bound the coordinator waits for an await round-trip. The worker
    /// resolves within deadline plus one interval; one more is slack.
    pub fn await_guard(&self) -> Duration {
        self.await_timeout() + self.poll_interval() * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConductorConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.await_timeout_ms, 30_000);
        assert_eq!(config.min_content_len, 5);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "await_timeout_ms": 2000, "log_level": "debug" }"#).unwrap();

        let config = ConductorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.await_timeout(), Duration::from_millis(2000));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = ConductorConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
