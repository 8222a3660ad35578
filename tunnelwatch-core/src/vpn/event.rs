//! Events flowing into and out of the state machine
//!
//! `RawEvent` is what the tunnel daemon reports. `Notice` is what the state
//! machine reports on top of plain state changes.

use crate::types::{ConnectionProfile, Server};
use crate::vpn::state::ConnectionState;
use serde::Serialize;

/// Lifecycle event reported by the tunnel daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Tunnel is down
    Disabled,

    /// Server availability check started
    CheckingAvailability,

    /// Port scan started
    ScanningPorts,

    /// Tunnel establishment started for a profile
    Connecting { profile: ConnectionProfile },

    /// Device lost its network while the tunnel was up
    WaitingForNetwork,

    /// Tunnel established to a server
    Connected { server: Server },

    /// Tunnel teardown started
    Disconnecting,

    /// Attempt failed with a raw fault code
    Fault { code: String, description: String },
}

impl RawEvent {
    /// Build a fault event
    pub fn fault(code: impl Into<String>, description: impl Into<String>) -> Self {
        RawEvent::Fault {
            code: code.into(),
            description: description.into(),
        }
    }
}

/// One-off notifications published next to state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The tunnel went down without the user asking for it
    DisconnectedFromOutside { previous: ConnectionState },

    /// Automatic attempts are used up; the error stays until the user acts
    RetriesExhausted { attempts: u32 },
}
