//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

pub mod classify;
pub mod monitor;
pub mod status;

use std::path::PathBuf;
use tunnelwatch_core::config::toml_config::{get_config_path, load_config_or_default, TomlConfig};
use tunnelwatch_core::error::TunnelwatchError;

/// Load the configuration from `path`, or from the default location
///
/// A missing file yields the defaults.
pub(crate) fn load(path: Option<PathBuf>) -> Result<(PathBuf, TomlConfig), TunnelwatchError> {
    let path = match path {
        Some(path) => path,
        None => get_config_path()?,
    };
    let config = load_config_or_default(&path)?;
    Ok((path, config))
}
