//! Process configuration: where to listen and how long to drain on shutdown.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//! shutdown_timeout_secs = 10
//! ```
//!
//! Every field is optional. [`Config::discover`] looks for `fresco.toml` in a
//! directory and, when there is none, listens on `localhost` at a random port.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// File name [`Config::discover`] looks for.
pub const FILE_NAME: &str = "fresco.toml";

/// Range the fallback port is drawn from.
const RANDOM_PORTS: std::ops::Range<u16> = 1111..9999;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// How long in-flight requests may run after a shutdown signal.
    pub shutdown_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8080,
            shutdown_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Parses and validates TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates one file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        Self::parse(&text)
    }

    /// Loads `dir/fresco.toml`, or falls back to `localhost` on a random port
    /// when the file does not exist. Any other read error is returned.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Self::random_port();
                tracing::info!(path = %path.display(), port = config.port, "no config file, using a random port");
                Ok(config)
            }
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    fn random_port() -> Self {
        Self { port: fastrand::u16(RANDOM_PORTS), ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero"));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Invalid("shutdown_timeout_secs must be positive"));
        }
        Ok(())
    }

    /// `host:port`, ready for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = Config::parse("host = \"0.0.0.0\"\nport = 3000\nshutdown_timeout_secs = 10\n").unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert!(matches!(Config::parse("hots = \"x\""), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::parse("port = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::parse("host = \" \""), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::parse("shutdown_timeout_secs = 0"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_falls_back_to_random_port() {
        let dir = std::env::temp_dir().join(format!("fresco-missing-{}", std::process::id()));
        let config = Config::discover(&dir).unwrap();
        assert_eq!(config.host, "localhost");
        assert!(RANDOM_PORTS.contains(&config.port));
    }

    #[test]
    fn discover_reads_the_file() {
        let dir = std::env::temp_dir().join(format!("fresco-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(FILE_NAME), "port = 4321").unwrap();

        let config = Config::discover(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert_eq!(config.port, 4321);
    }
}
