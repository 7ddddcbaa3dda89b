//! Configuration for the command sender
//!
//! Precedence: CLI flags > environment > config file > defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sink::DryRunFormat;

/// Environment variable overriding the serial port
pub const ENV_PORT: &str = "PIGFX_PORT";
/// Environment variable overriding the baud rate
pub const ENV_BAUD: &str = "PIGFX_BAUD";

/// Sender configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link to the device
    pub serial: SerialConfig,
    /// Print commands instead of sending them
    pub dry_run: bool,
    /// Rendering used for dry runs
    pub dry_run_format: DryRunFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            dry_run: false,
            dry_run_format: DryRunFormat::Escaped,
        }
    }
}

/// Serial port settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds; the sender only writes
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from the default location or return defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.serial.port = port;
        }
        if let Some(baud) = lookup(ENV_BAUD) {
            self.serial.baud_rate = baud.trim().parse().map_err(|_| ConfigError::Invalid {
                field: ENV_BAUD,
                reason: format!("'{}' is not a baud rate", baud),
            })?;
        }
        Ok(())
    }

    /// Check values that would only fail later when opening the port
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "serial.port",
                reason: "port name is empty".to_string(),
            });
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "serial.baud_rate",
                reason: "baud rate must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Default config file location, `~/.config/pigfx-link/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("pigfx-link")
            .join("config.json")
    })
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.timeout_ms, 1000);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.serial.port = "COM4".to_string();
        config.dry_run_format = DryRunFormat::Raw;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"serial": {"baud_rate": 9600}}"#).unwrap();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.dry_run_format, DryRunFormat::Escaped);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_from(|key| match key {
                ENV_PORT => Some("/dev/ttyAMA0".to_string()),
                ENV_BAUD => Some("57600".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.serial.port, "/dev/ttyAMA0");
        assert_eq!(config.serial.baud_rate, 57600);
    }

    #[test]
    fn test_env_bad_baud() {
        let mut config = Config::default();
        let err = config
            .apply_env_from(|key| (key == ENV_BAUD).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: ENV_BAUD, .. }));
    }

    #[test]
    fn test_validate_rejects_zero_baud() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Json(_))));
    }
}
