//! Connection lifecycle state machine
//!
//! `ConnectionStateMachine` is the single writer of the connection status.
//! It turns tunnel events into states, classifies faults, runs the retry
//! countdown and issues the resulting commands back to the tunnel. All of
//! it is synchronous; `ConnectionMonitor` drives it from an async task and
//! supplies the one-second tick.

use crate::error::{ConnectError, TunnelError, TunnelwatchError};
use crate::types::ConnectionProfile;
use crate::vpn::bridge::{self, StateObserverBridge, StatePublisher};
use crate::vpn::event::{Notice, RawEvent};
use crate::vpn::fault::{self, ConnectionFault};
use crate::vpn::retry::{RetryInfo, RetryPolicy, RetryScheduler, RetryTick};
use crate::vpn::state::{ConnectionState, Status};
use crate::vpn::tunnel::TunnelController;
use tracing::{debug, error, info, warn};

/// Fault code used when a command to the tunnel cannot be delivered
const COMMAND_FAILURE_CODE: &str = "UNREACHABLE";

/// Single-writer owner of the connection status
pub struct ConnectionStateMachine<T: TunnelController> {
    status: Status,
    tunnel: T,
    publisher: StatePublisher,
    scheduler: RetryScheduler,
    policy: RetryPolicy,

    /// Automatic reconnection attempts since the last success or user action
    attempts: u32,

    /// Profile of the failed attempt the running countdown will retry
    retry_profile: Option<ConnectionProfile>,

    /// A prompt-style fault is waiting for the user to dismiss it
    awaiting_ack: bool,
}

impl<T: TunnelController> ConnectionStateMachine<T> {
    /// Create a state machine in the `Disabled` state
    ///
    /// # Returns
    ///
    /// The machine and the bridge observers subscribe through
    pub fn new(tunnel: T, policy: RetryPolicy) -> (Self, StateObserverBridge) {
        let (publisher, bridge) = bridge::channel(Status::default());
        let machine = Self {
            status: Status::default(),
            tunnel,
            publisher,
            scheduler: RetryScheduler::new(),
            policy,
            attempts: 0,
            retry_profile: None,
            awaiting_ack: false,
        };
        (machine, bridge)
    }

    /// Current connection state
    pub fn state(&self) -> &ConnectionState {
        &self.status.state
    }

    /// Current status snapshot
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Current retry countdown
    pub fn retry_info(&self) -> Option<RetryInfo> {
        self.scheduler.info()
    }

    /// Whether a retry countdown is running
    pub fn is_retry_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Changes whenever a new countdown starts
    pub fn retry_generation(&self) -> u64 {
        self.scheduler.generation()
    }

    /// Automatic attempts made since the last success or user action
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the current error must be acknowledged before connecting
    pub fn awaiting_acknowledgement(&self) -> bool {
        self.awaiting_ack
    }

    /// Apply an event reported by the tunnel
    ///
    /// Every event maps to exactly one state. An event that leaves the
    /// status unchanged is coalesced: no notification, no side effects.
    #[tracing::instrument(skip(self), fields(from = %self.status.state))]
    pub fn apply_event(&mut self, event: RawEvent) -> ConnectionState {
        let next = self.next_status(event);
        if next == self.status {
            debug!("Coalesced event, status unchanged");
            return self.status.state.clone();
        }

        let previous = std::mem::replace(&mut self.status, next);
        self.stop_retry();

        info!(to = %self.status.state, "Connection state changed");
        self.publisher.publish(self.status.clone());

        match self.status.state.clone() {
            ConnectionState::Disabled => {
                self.attempts = 0;
                if previous.state.is_connected()
                    || matches!(previous.state, ConnectionState::Connecting)
                {
                    info!(previous = %previous.state, "Tunnel went down without a local request");
                    self.publisher.notify(Notice::DisconnectedFromOutside {
                        previous: previous.state,
                    });
                }
            }
            ConnectionState::Connecting => {
                self.awaiting_ack = false;
            }
            ConnectionState::Connected => {
                self.attempts = 0;
                self.awaiting_ack = false;
            }
            ConnectionState::Error(fault) => self.enter_error(fault),
            ConnectionState::CheckingAvailability
            | ConnectionState::ScanningPorts
            | ConnectionState::WaitingForNetwork
            | ConnectionState::Disconnecting => {}
        }

        self.status.state.clone()
    }

    /// Advance the retry countdown by one second
    ///
    /// On expiry the machine re-enters `Connecting` and asks the tunnel to
    /// reconnect with the profile that failed. Returns `None` when no
    /// countdown is running.
    pub fn tick_retry(&mut self) -> Option<RetryTick> {
        let tick = self.scheduler.tick()?;

        match tick {
            RetryTick::Pending(info) => {
                self.publisher.publish_retry(Some(info));
            }
            RetryTick::Expired => {
                self.publisher.publish_retry(None);
                self.on_retry_expired();
            }
        }

        Some(tick)
    }

    /// Ask the tunnel to connect to a profile
    ///
    /// Refused while a prompt-style error waits for acknowledgement.
    pub fn connect(&mut self, profile: &ConnectionProfile) -> Result<(), TunnelwatchError> {
        if self.awaiting_ack {
            warn!(profile = %profile.name, "Connect refused, error not acknowledged");
            return Err(ConnectError::AcknowledgementRequired.into());
        }

        self.stop_retry();
        self.attempts = 0;

        info!(profile = %profile.name, "Requesting connection");
        if let Err(e) = self.tunnel.connect(profile) {
            self.report_command_failure(&e);
            return Err(e.into());
        }

        Ok(())
    }

    /// Ask the tunnel to disconnect on behalf of the user
    pub fn disconnect(&mut self) -> Result<(), TunnelError> {
        self.stop_retry();
        self.attempts = 0;
        self.awaiting_ack = false;

        info!("Requesting disconnect");
        self.tunnel.disconnect()
    }

    /// Dismiss the current error
    ///
    /// Also clears a pending acknowledgement after the tunnel already went
    /// down on its own. While still in the error state the tunnel is told to
    /// disconnect, which lets the next connection start from a clean state.
    pub fn acknowledge_error(&mut self) {
        let in_error = self.status.state.is_error();
        if !self.awaiting_ack && !in_error {
            debug!("Nothing to acknowledge");
            return;
        }

        info!(in_error, "Error acknowledged");
        self.awaiting_ack = false;
        self.attempts = 0;
        self.stop_retry();
        if in_error {
            self.issue_disconnect();
        }
    }

    /// Cancel the running countdown and disconnect
    ///
    /// A live tunnel with no countdown and no error is left alone. Returns
    /// whether a countdown was running.
    pub fn cancel_retry(&mut self) -> bool {
        let was_active = self.stop_retry();
        self.attempts = 0;
        info!(was_active, "Retry cancelled by user");
        if was_active || self.status.state.is_error() {
            self.issue_disconnect();
        }
        was_active
    }

    /// Skip the countdown and reconnect immediately
    pub fn retry_now(&mut self) -> Result<(), TunnelError> {
        let profile = self
            .retry_profile
            .take()
            .or_else(|| self.status.profile.clone())
            .ok_or(TunnelError::NoProfile)?;

        self.attempts = 0;
        self.awaiting_ack = false;
        self.reconnect(profile)
    }

    /// Stop the countdown and close every observer channel
    pub fn shutdown(mut self) {
        self.stop_retry();
        info!(state = %self.status.state, "Connection state machine shut down");
    }

    fn next_status(&self, event: RawEvent) -> Status {
        let current = &self.status;
        let state = match event {
            RawEvent::Disabled => {
                return Status {
                    state: ConnectionState::Disabled,
                    profile: current.profile.clone(),
                    server: None,
                };
            }
            RawEvent::Connecting { profile } => {
                // The server is only known up front when the profile names one
                return Status {
                    state: ConnectionState::Connecting,
                    server: profile.server.clone(),
                    profile: Some(profile),
                };
            }
            RawEvent::Connected { server } => {
                return Status {
                    state: ConnectionState::Connected,
                    profile: current.profile.clone(),
                    server: Some(server),
                };
            }
            RawEvent::CheckingAvailability => ConnectionState::CheckingAvailability,
            RawEvent::ScanningPorts => ConnectionState::ScanningPorts,
            RawEvent::WaitingForNetwork => ConnectionState::WaitingForNetwork,
            RawEvent::Disconnecting => ConnectionState::Disconnecting,
            RawEvent::Fault { code, description } => {
                ConnectionState::Error(fault::classify(&code, &description).0)
            }
        };

        Status {
            state,
            ..current.clone()
        }
    }

    fn enter_error(&mut self, fault: ConnectionFault) {
        let action = fault.action();

        if let Some(diagnostic) = fault.diagnostic() {
            error!(code = fault.code(), ?action, "{}", diagnostic);
        }

        if action.forces_disconnect() {
            self.issue_disconnect();
        }

        if action.requires_acknowledgement() {
            self.awaiting_ack = true;
        }

        if action.is_retryable() {
            self.schedule_retry();
        }
    }

    fn schedule_retry(&mut self) {
        let Some(profile) = self.status.profile.clone() else {
            warn!("No profile to retry, countdown not started");
            return;
        };

        if self.attempts >= self.policy.max_attempts {
            warn!(attempts = self.attempts, "Automatic reconnection attempts exhausted");
            self.publisher.notify(Notice::RetriesExhausted {
                attempts: self.attempts,
            });
            return;
        }

        let timeout = self.policy.timeout_for_attempt(self.attempts + 1);
        let info = self.scheduler.start(timeout);
        self.retry_profile = Some(profile);
        self.publisher.publish_retry(Some(info));

        info!(
            attempt = self.attempts + 1,
            max_attempts = self.policy.max_attempts,
            timeout_secs = timeout,
            "Retry countdown started"
        );
    }

    fn on_retry_expired(&mut self) {
        let Some(profile) = self.retry_profile.take() else {
            return;
        };

        self.attempts += 1;
        info!(
            attempt = self.attempts,
            max_attempts = self.policy.max_attempts,
            "Retry countdown expired"
        );

        if let Err(e) = self.reconnect(profile) {
            debug!("Reconnect failed: {}", e);
        }
    }

    fn reconnect(&mut self, profile: ConnectionProfile) -> Result<(), TunnelError> {
        self.apply_event(RawEvent::Connecting {
            profile: profile.clone(),
        });

        info!(profile = %profile.name, "Requesting reconnection");
        self.tunnel.reconnect(&profile).map_err(|e| {
            self.report_command_failure(&e);
            e
        })
    }

    /// Feed a failed command back into the machine as a fault
    fn report_command_failure(&mut self, e: &TunnelError) {
        warn!("Tunnel command failed: {}", e);
        self.apply_event(RawEvent::fault(COMMAND_FAILURE_CODE, e.to_string()));
    }

    fn issue_disconnect(&mut self) {
        if let Err(e) = self.tunnel.disconnect() {
            warn!("Failed to send disconnect to tunnel: {}", e);
        }
    }

    fn stop_retry(&mut self) -> bool {
        self.retry_profile = None;
        let was_active = self.scheduler.cancel();
        if was_active {
            debug!("Retry countdown stopped");
        }
        self.publisher.publish_retry(None);
        was_active
    }
}
