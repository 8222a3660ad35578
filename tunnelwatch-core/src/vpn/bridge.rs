//! Publish/subscribe surface for connection status
//!
//! The state machine holds the only `StatePublisher`; observers get a
//! cloneable `StateObserverBridge`. Status and retry progress travel over
//! `watch` channels, so every subscriber sees the latest value immediately
//! and a slow subscriber only ever skips stale values, never blocks the
//! writer. Notices are one-off events and use a `broadcast` channel.
//!
//! Dropping the publisher closes every channel, which ends all
//! subscriptions.

use crate::vpn::event::Notice;
use crate::vpn::fault::ConnectionFault;
use crate::vpn::retry::RetryInfo;
use crate::vpn::state::{Status, StatusLabel};
use tokio::sync::{broadcast, watch};

/// Notices kept for subscribers that fall behind
const NOTICE_CAPACITY: usize = 16;

/// Create a connected publisher/bridge pair
pub fn channel(initial: Status) -> (StatePublisher, StateObserverBridge) {
    let (status_tx, status_rx) = watch::channel(initial);
    let (retry_tx, retry_rx) = watch::channel(None);
    let (notice_tx, notice_rx) = broadcast::channel(NOTICE_CAPACITY);

    let publisher = StatePublisher {
        status_tx,
        retry_tx,
        notice_tx,
    };
    let bridge = StateObserverBridge {
        status_rx,
        retry_rx,
        notice_rx,
    };
    (publisher, bridge)
}

/// Writer side, owned by the state machine
#[derive(Debug)]
pub struct StatePublisher {
    status_tx: watch::Sender<Status>,
    retry_tx: watch::Sender<Option<RetryInfo>>,
    notice_tx: broadcast::Sender<Notice>,
}

impl StatePublisher {
    /// Publish a status; returns whether observers were notified
    ///
    /// A status equal to the current one is not republished.
    pub fn publish(&self, status: Status) -> bool {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        })
    }

    /// Publish retry countdown progress
    pub fn publish_retry(&self, retry: Option<RetryInfo>) {
        self.retry_tx.send_if_modified(|current| {
            if *current == retry {
                false
            } else {
                *current = retry;
                true
            }
        });
    }

    /// Publish a notice to current notice subscribers
    pub fn notify(&self, notice: Notice) {
        // No subscribers is fine, the notice is simply not observed
        let _ = self.notice_tx.send(notice);
    }
}

/// Observer side, handed to UI components
#[derive(Debug)]
pub struct StateObserverBridge {
    status_rx: watch::Receiver<Status>,
    retry_rx: watch::Receiver<Option<RetryInfo>>,
    notice_rx: broadcast::Receiver<Notice>,
}

impl Clone for StateObserverBridge {
    fn clone(&self) -> Self {
        Self {
            status_rx: self.status_rx.clone(),
            retry_rx: self.retry_rx.clone(),
            notice_rx: self.notice_rx.resubscribe(),
        }
    }
}

impl StateObserverBridge {
    /// Subscribe to status changes
    ///
    /// The first item is the current status, followed by every change.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            status_rx: self.status_rx.clone(),
            replayed: false,
        }
    }

    /// Subscribe to retry countdown progress
    pub fn subscribe_retry(&self) -> watch::Receiver<Option<RetryInfo>> {
        self.retry_rx.clone()
    }

    /// Subscribe to notices published from now on
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_rx.resubscribe()
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status_rx.borrow().clone()
    }

    /// Current retry countdown, if one is running
    pub fn retry_info(&self) -> Option<RetryInfo> {
        *self.retry_rx.borrow()
    }

    /// Fault of the current error state
    pub fn fault(&self) -> Option<ConnectionFault> {
        self.status_rx.borrow().state.fault().cloned()
    }

    /// Label inputs for the current status
    pub fn label(&self) -> StatusLabel {
        StatusLabel::for_status(&self.status(), self.retry_info())
    }
}

/// Stream of statuses for one observer
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    status_rx: watch::Receiver<Status>,
    replayed: bool,
}

impl Subscription {
    /// Wait for the next status
    ///
    /// Returns `None` once the state machine has shut down.
    pub async fn next(&mut self) -> Option<Status> {
        if !self.replayed {
            self.replayed = true;
            return Some(self.status_rx.borrow_and_update().clone());
        }

        self.status_rx.changed().await.ok()?;
        Some(self.status_rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::state::ConnectionState;

    fn status(state: ConnectionState) -> Status {
        Status {
            state,
            ..Status::default()
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_current_state_first() {
        let (publisher, bridge) = channel(Status::default());
        publisher.publish(status(ConnectionState::Connecting));

        let mut subscription = bridge.subscribe();
        let first = subscription.next().await.unwrap();
        assert_eq!(first.state, ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_slow_subscriber_only_sees_latest() {
        let (publisher, bridge) = channel(Status::default());
        let mut subscription = bridge.subscribe();
        assert_eq!(subscription.next().await.unwrap().state, ConnectionState::Disabled);

        publisher.publish(status(ConnectionState::Connecting));
        publisher.publish(status(ConnectionState::Connected));

        assert_eq!(subscription.next().await.unwrap().state, ConnectionState::Connected);
    }

    #[test]
    fn test_identical_status_is_not_republished() {
        let (publisher, _bridge) = channel(Status::default());
        assert!(publisher.publish(status(ConnectionState::Connected)));
        assert!(!publisher.publish(status(ConnectionState::Connected)));
        assert!(publisher.publish(status(ConnectionState::Disabled)));
    }

    #[tokio::test]
    async fn test_dropping_publisher_ends_subscriptions() {
        let (publisher, bridge) = channel(Status::default());
        let mut subscription = bridge.subscribe();
        subscription.next().await.unwrap();

        drop(publisher);
        assert_eq!(subscription.next().await, None);

        // The last status stays queryable
        assert_eq!(bridge.status().state, ConnectionState::Disabled);
    }

    #[tokio::test]
    async fn test_notices_reach_every_subscriber() {
        let (publisher, bridge) = channel(Status::default());
        let mut first = bridge.subscribe_notices();
        let mut second = bridge.clone().subscribe_notices();

        publisher.notify(Notice::RetriesExhausted { attempts: 5 });

        assert_eq!(first.recv().await.unwrap(), Notice::RetriesExhausted { attempts: 5 });
        assert_eq!(second.recv().await.unwrap(), Notice::RetriesExhausted { attempts: 5 });
    }
}
