//! Error types for tunnelwatch
//!
//! Connection faults reported by the tunnel daemon are not errors in this
//! sense: they are classified into `ConnectionFault` and become part of the
//! connection state. The types here cover the operations that can actually
//! fail: loading configuration, issuing commands to the tunnel daemon and
//! pre-flight checks before a connection attempt.

use thiserror::Error;

/// Main error type for the tunnelwatch crates
#[derive(Error, Debug)]
pub enum TunnelwatchError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to commands sent to the tunnel daemon
    #[error("Tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// Connection attempts refused before reaching the tunnel
    #[error("Connect rejected: {0}")]
    Connect(#[from] ConnectError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Failures of commands issued to the tunnel daemon
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TunnelError {
    #[error("Tunnel rejected command: {reason}")]
    CommandRejected { reason: String },

    #[error("Tunnel command channel closed")]
    ChannelClosed,

    #[error("No connection profile to reconnect with")]
    NoProfile,
}

/// Reasons a connection request is refused before it reaches the tunnel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Server requires a higher plan (secure core: {secure_core}, plus: {plus})")]
    UpgradeRequired { secure_core: bool, plus: bool },

    #[error("Server is under maintenance")]
    ServerInMaintenance,

    #[error("Previous connection error must be acknowledged first")]
    AcknowledgementRequired,

    #[error("Connection monitor is not running")]
    MonitorStopped,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TunnelwatchError>;
