//! Configuration loading for DARE tools

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths::Paths;

/// Environment variable overriding the default server
pub const SERVER_ENV: &str = "DARE_SERVER";

/// Environment variable overriding the store location
pub const STORE_ENV: &str = "DARE_STORE";

/// DARE client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Default service root used when no --server is given
    pub server: Option<String>,

    /// Seconds to wait between polls of a resource that is not ready yet
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up polling after this many attempts (unbounded when absent)
    pub max_polls: Option<u32>,

    /// Override for the local store file
    pub store_path: Option<PathBuf>,

    /// Per-request HTTP timeout
    pub request_timeout_secs: Option<u64>,
}

fn default_poll_interval() -> u64 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            poll_interval_secs: default_poll_interval(),
            max_polls: None,
            store_path: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from the user's config file and environment
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Paths::new().config_file())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a file, or use defaults when it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        if config.max_polls == Some(0) {
            bail!("max_polls in {:?} must be greater than zero", path);
        }

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = lookup(SERVER_ENV).filter(|s| !s.is_empty()) {
            self.server = Some(server);
        }
        if let Some(store) = lookup(STORE_ENV).filter(|s| !s.is_empty()) {
            self.store_path = Some(PathBuf::from(store));
        }
    }

    /// Store file to use, falling back to ~/.dare
    pub fn store_file(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| Paths::new().store())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config::load_from(&tmp.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert!(config.max_polls.is_none());
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
server = "http://localhost:8080/dare"
poll_interval_secs = 5
max_polls = 30
store_path = "/tmp/dare.db"
"#,
        )?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.server.as_deref(), Some("http://localhost:8080/dare"));
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.max_polls, Some(30));
        assert_eq!(config.store_file(), PathBuf::from("/tmp/dare.db"));
        assert!(config.request_timeout().is_none());
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_an_error() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");
        fs::write(&path, "poll_interval_secs = \"often\"")?;
        assert!(Config::load_from(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_zero_max_polls_is_rejected() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");
        fs::write(&path, "max_polls = 0")?;

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_polls"));
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config {
            server: Some("http://from-file".to_string()),
            ..Config::default()
        };
        config.apply_env(|key| match key {
            SERVER_ENV => Some("http://from-env".to_string()),
            STORE_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.server.as_deref(), Some("http://from-env"));
        assert!(config.store_path.is_none());
    }
}
