//! TOML configuration file I/O
//!
//! Handles loading and saving client configuration to/from TOML files
//! in the user's configuration directory.

use crate::config::ClientConfig;
use crate::error::{ConfigError, TunnelwatchError};
use crate::vpn::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Complete TOML configuration structure
///
/// Contains both client configuration and retry policy settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Client settings
    #[serde(rename = "client", default)]
    pub client: ClientConfig,

    /// Retry policy settings (optional)
    #[serde(rename = "retry", default)]
    pub retry: Option<RetryPolicy>,
}

impl TomlConfig {
    /// Create a new TOML configuration
    pub fn new(client: ClientConfig, retry: Option<RetryPolicy>) -> Self {
        Self { client, retry }
    }

    /// Load configuration from a TOML file
    ///
    /// A missing file is reported as `ConfigError::LoadFailed` so callers can
    /// fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, TunnelwatchError> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TunnelwatchError::Config(ConfigError::LoadFailed {
                path: path.to_string_lossy().to_string(),
            }),
            _ => TunnelwatchError::Config(ConfigError::IoError {
                message: format!("Failed to read config file: {}", e),
            }),
        })?;

        let config: TomlConfig = toml::from_str(&contents).map_err(|e| {
            TunnelwatchError::Config(ConfigError::ValidationError {
                message: format!("Failed to parse config file: {}", e),
            })
        })?;

        config.validate()?;

        if let Some(ref policy) = config.retry {
            info!(
                "Loaded retry policy: base_timeout={}s, backoff_multiplier={}, max_timeout={}s, max_attempts={}",
                policy.base_timeout_secs,
                policy.backoff_multiplier,
                policy.max_timeout_secs,
                policy.max_attempts
            );
        } else {
            debug!("No retry policy specified in config, defaults will be used");
        }

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), TunnelwatchError> {
        self.validate()?;

        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TunnelwatchError::Config(ConfigError::IoError {
                    message: format!("Failed to create config directory: {}", e),
                })
            })?;
        }

        std::fs::write(path, contents).map_err(|_| {
            TunnelwatchError::Config(ConfigError::SaveFailed {
                path: path.to_string_lossy().to_string(),
            })
        })?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate client settings and the retry policy
    pub fn validate(&self) -> Result<(), TunnelwatchError> {
        self.client
            .validate()
            .map_err(|message| TunnelwatchError::Config(ConfigError::ValidationError { message }))?;

        if let Some(ref policy) = self.retry {
            debug!("Validating retry policy from config");

            policy.validate().map_err(|e| {
                warn!("Retry policy validation failed: {}", e);
                TunnelwatchError::Config(ConfigError::ValidationError {
                    message: format!("Invalid retry policy: {}", e),
                })
            })?;
        }

        Ok(())
    }

    /// Get the retry policy, or the default one if not configured
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default()
    }
}

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/tunnelwatch, or TUNNELWATCH_CONFIG_DIR environment
/// variable if set
pub fn get_config_dir() -> Result<PathBuf, TunnelwatchError> {
    if let Ok(config_dir) = std::env::var("TUNNELWATCH_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        TunnelwatchError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("tunnelwatch"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, TunnelwatchError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default TOML file
pub fn load_config() -> Result<TomlConfig, TunnelwatchError> {
    let config_path = get_config_path()?;
    load_config_from_path(&config_path)
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<TomlConfig, TunnelwatchError> {
    TomlConfig::from_file(path.as_ref())
}

/// Load configuration, falling back to defaults when the file does not exist
///
/// Parse and validation failures are still reported.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<TomlConfig, TunnelwatchError> {
    match load_config_from_path(&path) {
        Err(TunnelwatchError::Config(ConfigError::LoadFailed { path })) => {
            debug!("No config file at {}, using defaults", path);
            Ok(TomlConfig::default())
        }
        result => result,
    }
}

/// Save configuration to a specific TOML file
pub fn save_config_to_path<P: AsRef<Path>>(
    config: &TomlConfig,
    path: P,
) -> Result<(), TunnelwatchError> {
    config.to_file(path.as_ref())
}
