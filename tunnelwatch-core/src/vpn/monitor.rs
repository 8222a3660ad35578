//! Connection monitor task
//!
//! Owns the state machine inside a tokio task. Raw tunnel events and user
//! commands arrive over channels and are applied one at a time, so the
//! machine keeps a single writer. The retry tick is an interval that only
//! exists while a countdown is running and is dropped the moment the
//! machine leaves the error state.

use crate::error::{ConnectError, TunnelwatchError};
use crate::types::ConnectionProfile;
use crate::vpn::access::{check_access, Entitlements};
use crate::vpn::bridge::StateObserverBridge;
use crate::vpn::event::RawEvent;
use crate::vpn::machine::ConnectionStateMachine;
use crate::vpn::retry::RetryPolicy;
use crate::vpn::tunnel::TunnelController;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Period of the retry countdown
pub const RETRY_TICK: Duration = Duration::from_secs(1);

/// Commands from the user side of the client
#[derive(Debug)]
pub enum MonitorCommand {
    /// Connect to a profile after the access check
    Connect {
        profile: ConnectionProfile,
        reply: oneshot::Sender<Result<(), TunnelwatchError>>,
    },

    /// Disconnect on user request
    Disconnect,

    /// Dismiss the current error
    AcknowledgeError,

    /// Cancel the retry countdown and disconnect
    CancelRetry,

    /// Reconnect without waiting for the countdown
    RetryNow,

    /// Stop the monitor
    Shutdown,
}

/// Handle to a running connection monitor
pub struct ConnectionMonitor {
    event_tx: mpsc::UnboundedSender<RawEvent>,
    command_tx: mpsc::UnboundedSender<MonitorCommand>,
    bridge: StateObserverBridge,
    task: JoinHandle<()>,
}

impl ConnectionMonitor {
    /// Spawn the monitor task on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `tunnel` - Controller commands are issued to
    /// * `policy` - Retry countdown policy
    /// * `entitlements` - Account entitlements used by the pre-flight check
    pub fn spawn<T, E>(tunnel: T, policy: RetryPolicy, entitlements: E) -> Self
    where
        T: TunnelController + Send + 'static,
        E: Entitlements + Send + 'static,
    {
        let (machine, bridge) = ConnectionStateMachine::new(tunnel, policy);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(machine, entitlements, event_rx, command_rx));
        info!("Connection monitor started");

        Self {
            event_tx,
            command_tx,
            bridge,
            task,
        }
    }

    /// Sender the tunnel integration pushes raw events into
    pub fn event_sender(&self) -> mpsc::UnboundedSender<RawEvent> {
        self.event_tx.clone()
    }

    /// Push a single raw event
    pub fn on_raw_event(&self, event: RawEvent) -> Result<(), ConnectError> {
        self.event_tx
            .send(event)
            .map_err(|_| ConnectError::MonitorStopped)
    }

    /// Bridge observers subscribe through
    pub fn bridge(&self) -> StateObserverBridge {
        self.bridge.clone()
    }

    /// Connect to a profile
    ///
    /// Rejected before reaching the tunnel when the account cannot use the
    /// server, when the server is in maintenance, or while an error waits
    /// for acknowledgement.
    pub async fn connect(&self, profile: ConnectionProfile) -> Result<(), TunnelwatchError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(MonitorCommand::Connect { profile, reply })?;

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::MonitorStopped.into()),
        }
    }

    /// Disconnect on user request
    pub fn disconnect(&self) -> Result<(), ConnectError> {
        self.send(MonitorCommand::Disconnect)
    }

    /// Dismiss the current error
    pub fn acknowledge_error(&self) -> Result<(), ConnectError> {
        self.send(MonitorCommand::AcknowledgeError)
    }

    /// Cancel the retry countdown and disconnect
    pub fn cancel_retry(&self) -> Result<(), ConnectError> {
        self.send(MonitorCommand::CancelRetry)
    }

    /// Reconnect without waiting for the countdown
    pub fn retry_now(&self) -> Result<(), ConnectError> {
        self.send(MonitorCommand::RetryNow)
    }

    /// Stop the monitor and wait for it to finish
    ///
    /// The countdown is cancelled and every subscription ends before this
    /// returns.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(MonitorCommand::Shutdown);
        if let Err(e) = self.task.await {
            warn!("Connection monitor task failed: {}", e);
        }
    }

    fn send(&self, command: MonitorCommand) -> Result<(), ConnectError> {
        self.command_tx
            .send(command)
            .map_err(|_| ConnectError::MonitorStopped)
    }
}

/// Event loop owning the state machine
async fn run<T, E>(
    mut machine: ConnectionStateMachine<T>,
    entitlements: E,
    mut event_rx: mpsc::UnboundedReceiver<RawEvent>,
    mut command_rx: mpsc::UnboundedReceiver<MonitorCommand>,
) where
    T: TunnelController,
    E: Entitlements,
{
    let mut ticker: Option<Interval> = None;
    let mut ticker_generation = machine.retry_generation();

    loop {
        tokio::select! {
            biased;

            // Events queued before a command are applied before it
            event = event_rx.recv() => match event {
                Some(event) => {
                    machine.apply_event(event);
                }
                None => break,
            },

            command = command_rx.recv() => match command {
                Some(MonitorCommand::Shutdown) | None => break,
                Some(command) => handle_command(&mut machine, &entitlements, command),
            },

            _ = next_tick(&mut ticker) => {
                machine.tick_retry();
            }
        }

        sync_ticker(&machine, &mut ticker, &mut ticker_generation);
    }

    machine.shutdown();
    info!("Connection monitor stopped");
}

fn handle_command<T, E>(
    machine: &mut ConnectionStateMachine<T>,
    entitlements: &E,
    command: MonitorCommand,
) where
    T: TunnelController,
    E: Entitlements,
{
    match command {
        MonitorCommand::Connect { profile, reply } => {
            let result = match check_access(&profile, entitlements) {
                Ok(()) => machine.connect(&profile),
                Err(e) => {
                    info!(profile = %profile.name, "Connection refused before reaching the tunnel: {}", e);
                    Err(e.into())
                }
            };
            // The requester may have stopped waiting
            let _ = reply.send(result);
        }
        MonitorCommand::Disconnect => {
            if let Err(e) = machine.disconnect() {
                warn!("Disconnect failed: {}", e);
            }
        }
        MonitorCommand::AcknowledgeError => machine.acknowledge_error(),
        MonitorCommand::CancelRetry => {
            machine.cancel_retry();
        }
        MonitorCommand::RetryNow => {
            if let Err(e) = machine.retry_now() {
                warn!("Immediate retry failed: {}", e);
            }
        }
        MonitorCommand::Shutdown => {}
    }
}

/// Wait for the next countdown tick, or forever when none is running
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Keep the interval aligned with the machine's countdown
fn sync_ticker<T: TunnelController>(
    machine: &ConnectionStateMachine<T>,
    ticker: &mut Option<Interval>,
    generation: &mut u64,
) {
    if !machine.is_retry_active() {
        if ticker.take().is_some() {
            debug!("Retry ticker stopped");
        }
        return;
    }

    if ticker.is_none() || machine.retry_generation() != *generation {
        *generation = machine.retry_generation();
        let mut interval = time::interval_at(Instant::now() + RETRY_TICK, RETRY_TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        *ticker = Some(interval);
        debug!("Retry ticker started");
    }
}
