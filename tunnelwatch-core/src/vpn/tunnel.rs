//! Commands sent back to the tunnel daemon
//!
//! The daemon itself lives outside this crate. The state machine only needs
//! to tell it to connect, reconnect or disconnect, which is what
//! `TunnelController` captures.

use crate::error::TunnelError;
use crate::types::ConnectionProfile;
use serde::Serialize;
use tokio::sync::mpsc;

/// Command issued to the tunnel daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "profile", rename_all = "snake_case")]
pub enum TunnelCommand {
    /// Start a fresh connection requested by the user
    Connect(ConnectionProfile),

    /// Retry the connection that failed
    Reconnect(ConnectionProfile),

    /// Tear the tunnel down
    Disconnect,
}

/// Handle to the tunnel daemon
///
/// Implementations must not block: the state machine calls these from its
/// event loop. A returned error means the command could not be delivered.
pub trait TunnelController {
    fn connect(&self, profile: &ConnectionProfile) -> Result<(), TunnelError>;

    fn reconnect(&self, profile: &ConnectionProfile) -> Result<(), TunnelError>;

    fn disconnect(&self) -> Result<(), TunnelError>;
}

/// Controller that forwards commands over a channel
///
/// The receiving end belongs to whatever drives the daemon (a process
/// supervisor, an IPC client or a test).
#[derive(Debug, Clone)]
pub struct ChannelTunnel {
    command_tx: mpsc::UnboundedSender<TunnelCommand>,
}

impl ChannelTunnel {
    /// Create a controller and the receiver its commands arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TunnelCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (Self { command_tx }, command_rx)
    }

    fn send(&self, command: TunnelCommand) -> Result<(), TunnelError> {
        self.command_tx
            .send(command)
            .map_err(|_| TunnelError::ChannelClosed)
    }
}

impl TunnelController for ChannelTunnel {
    fn connect(&self, profile: &ConnectionProfile) -> Result<(), TunnelError> {
        self.send(TunnelCommand::Connect(profile.clone()))
    }

    fn reconnect(&self, profile: &ConnectionProfile) -> Result<(), TunnelError> {
        self.send(TunnelCommand::Reconnect(profile.clone()))
    }

    fn disconnect(&self) -> Result<(), TunnelError> {
        self.send(TunnelCommand::Disconnect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let (tunnel, mut rx) = ChannelTunnel::new();
        let profile = ConnectionProfile::named("office");

        tunnel.connect(&profile).unwrap();
        tunnel.reconnect(&profile).unwrap();
        tunnel.disconnect().unwrap();

        assert_eq!(rx.try_recv().unwrap(), TunnelCommand::Connect(profile.clone()));
        assert_eq!(rx.try_recv().unwrap(), TunnelCommand::Reconnect(profile));
        assert_eq!(rx.try_recv().unwrap(), TunnelCommand::Disconnect);
    }

    #[test]
    fn test_closed_channel_reports_error() {
        let (tunnel, rx) = ChannelTunnel::new();
        drop(rx);
        assert_eq!(tunnel.disconnect(), Err(TunnelError::ChannelClosed));
    }
}
