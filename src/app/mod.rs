//! Application glue module
//!
//! Configuration and application-level utilities.

mod config;

pub use config::{default_config_path, Config, ConfigError, SerialConfig, ENV_BAUD, ENV_PORT};
