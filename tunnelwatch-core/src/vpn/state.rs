//! VPN connection state
//!
//! Defines the states the client can observe, the status snapshot that is
//! published to observers and the label inputs derived from it.

use crate::types::{ConnectionProfile, Server};
use crate::vpn::fault::ConnectionFault;
use crate::vpn::retry::RetryInfo;
use serde::{Deserialize, Serialize};

/// VPN connection states
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "fault", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No tunnel
    #[default]
    Disabled,

    /// Checking that the target server accepts connections
    CheckingAvailability,

    /// Looking for an open port on the target server
    ScanningPorts,

    /// Establishing the tunnel
    Connecting,

    /// Tunnel is up but the device has no network
    WaitingForNetwork,

    /// Tunnel established
    Connected,

    /// Tearing the tunnel down
    Disconnecting,

    /// The last attempt failed
    Error(ConnectionFault),
}

impl ConnectionState {
    /// Check if connected
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if a connection attempt is in progress
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::CheckingAvailability
                | ConnectionState::ScanningPorts
                | ConnectionState::Connecting
                | ConnectionState::WaitingForNetwork
        )
    }

    /// Check if in error state
    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionState::Error(_))
    }

    /// The fault behind an error state
    pub fn fault(&self) -> Option<&ConnectionFault> {
        match self {
            ConnectionState::Error(fault) => Some(fault),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disabled => write!(f, "disabled"),
            ConnectionState::CheckingAvailability => write!(f, "checking availability"),
            ConnectionState::ScanningPorts => write!(f, "scanning ports"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::WaitingForNetwork => write!(f, "waiting for network"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
            ConnectionState::Error(fault) => write!(f, "error: {}", fault),
        }
    }
}

/// Snapshot published to observers
///
/// Carries the state together with the connection target so that a change
/// of target (a new `connected` event for another server) is a change of
/// status even when the state itself stays the same.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    pub state: ConnectionState,

    /// Profile of the current or last connection attempt
    pub profile: Option<ConnectionProfile>,

    /// Server being connected to, or connected to
    pub server: Option<Server>,
}

impl Status {
    /// Name of the connection target as shown to the user
    ///
    /// Pre-baked profiles and profiles without a display name are named
    /// after the server the tunnel picked.
    pub fn target_name(&self) -> String {
        let Some(ref profile) = self.profile else {
            return self
                .server
                .as_ref()
                .map(|server| server.display_name().to_string())
                .unwrap_or_default();
        };

        match self.server {
            Some(ref server) if profile.pre_baked || profile.display_name.is_empty() => {
                server.display_name().to_string()
            }
            _ if profile.display_name.is_empty() => profile.name.clone(),
            _ => profile.display_name.clone(),
        }
    }
}

/// Label inputs for rendering a status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum StatusLabel {
    NotConnected,
    CheckingAvailability,
    ConnectingTo { name: String },
    ReconnectingNoNetwork,
    ConnectedTo { name: String },
    Disconnecting,
    Error {
        message: String,
        retry_in_seconds: Option<u32>,
        show_support_link: bool,
    },
}

impl StatusLabel {
    /// Derive the label for a status and the current retry countdown
    pub fn for_status(status: &Status, retry: Option<RetryInfo>) -> Self {
        match status.state {
            ConnectionState::Disabled => StatusLabel::NotConnected,
            ConnectionState::CheckingAvailability | ConnectionState::ScanningPorts => {
                StatusLabel::CheckingAvailability
            }
            ConnectionState::Connecting => StatusLabel::ConnectingTo {
                name: status.target_name(),
            },
            ConnectionState::WaitingForNetwork => StatusLabel::ReconnectingNoNetwork,
            ConnectionState::Connected => StatusLabel::ConnectedTo {
                name: status.target_name(),
            },
            ConnectionState::Disconnecting => StatusLabel::Disconnecting,
            ConnectionState::Error(ref fault) => StatusLabel::Error {
                message: fault.message(),
                retry_in_seconds: retry.map(|info| info.retry_in_seconds),
                show_support_link: fault.shows_support_link(),
            },
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusLabel::NotConnected => write!(f, "Not connected"),
            StatusLabel::CheckingAvailability => write!(f, "Checking availability..."),
            StatusLabel::ConnectingTo { name } => write!(f, "Connecting to {}...", name),
            StatusLabel::ReconnectingNoNetwork => {
                write!(f, "No network available, waiting to reconnect...")
            }
            StatusLabel::ConnectedTo { name } => write!(f, "Connected to {}", name),
            StatusLabel::Disconnecting => write!(f, "Disconnecting..."),
            StatusLabel::Error {
                message,
                retry_in_seconds,
                ..
            } => match retry_in_seconds {
                Some(1) => write!(f, "{} Retrying in 1 second", message),
                Some(seconds) => write!(f, "{} Retrying in {} seconds", message, seconds),
                None => write!(f, "{}", message),
            },
        }
    }
}
