//! VPN connection lifecycle module
//!
//! Tracks the connection state reported by the tunnel daemon, classifies
//! its faults and schedules automatic reconnection.

pub mod event;
pub mod event_parser;
pub mod fault;
pub mod state;
pub mod tunnel;

// Retry countdown and reconnection
pub mod access;
pub mod bridge;
pub mod machine;
pub mod monitor;
pub mod retry;

// Public re-exports
pub use bridge::{StateObserverBridge, Subscription};
pub use event::{Notice, RawEvent};
pub use event_parser::EventParser;
pub use fault::{classify, ConnectionFault, FaultAction};
pub use machine::ConnectionStateMachine;
pub use monitor::ConnectionMonitor;
pub use retry::{RetryInfo, RetryPolicy, RetryScheduler, RetryTick};
pub use state::{ConnectionState, Status, StatusLabel};
pub use tunnel::{ChannelTunnel, TunnelCommand, TunnelController};
