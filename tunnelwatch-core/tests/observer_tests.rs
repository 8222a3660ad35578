//! End-to-end tests of the state machine as seen through the observer bridge

use tunnelwatch_core::types::{ConnectionProfile, Server};
use tunnelwatch_core::vpn::{
    ChannelTunnel, ConnectionFault, ConnectionState, ConnectionStateMachine, RawEvent,
    RetryPolicy, RetryTick, StatusLabel, TunnelCommand,
};

fn zurich() -> Server {
    Server {
        display_name: Some("Zurich #4".to_string()),
        ..Server::new("CH#4")
    }
}

fn fastest() -> ConnectionProfile {
    ConnectionProfile {
        pre_baked: true,
        display_name: "Fastest".to_string(),
        ..ConnectionProfile::named("fastest")
    }
}

#[tokio::test]
async fn test_lookup_failure_reaches_subscriber_with_countdown() {
    // Given: A subscriber and a connection attempt in progress
    let (tunnel, _commands) = ChannelTunnel::new();
    let (mut machine, bridge) = ConnectionStateMachine::new(tunnel, RetryPolicy::default());
    let mut statuses = bridge.subscribe();
    assert_eq!(
        statuses.next().await.map(|status| status.state),
        Some(ConnectionState::Disabled)
    );

    machine.apply_event(RawEvent::Connecting {
        profile: ConnectionProfile::new("office", zurich()),
    });
    assert_eq!(
        statuses.next().await.map(|status| status.state),
        Some(ConnectionState::Connecting)
    );

    // When: The attempt fails with LOOKUP_FAILED
    let state = machine.apply_event(RawEvent::fault("LOOKUP_FAILED", ""));

    // Then: The subscriber sees the error and the label carries the countdown
    assert_eq!(state, ConnectionState::Error(ConnectionFault::LookupFailed));
    assert_eq!(
        statuses.next().await.map(|status| status.state),
        Some(ConnectionState::Error(ConnectionFault::LookupFailed))
    );
    assert_eq!(
        bridge.label(),
        StatusLabel::Error {
            message: ConnectionFault::LookupFailed.message(),
            retry_in_seconds: Some(5),
            show_support_link: true,
        }
    );
}

#[tokio::test]
async fn test_identical_events_notify_once() {
    // Given: A subscriber past the initial status
    let (tunnel, _commands) = ChannelTunnel::new();
    let (mut machine, bridge) = ConnectionStateMachine::new(tunnel, RetryPolicy::default());
    let mut statuses = bridge.subscribe();
    statuses.next().await;

    // When: The same events are reported repeatedly
    for _ in 0..3 {
        machine.apply_event(RawEvent::CheckingAvailability);
    }
    let first = statuses.next().await.map(|status| status.state);

    for _ in 0..3 {
        machine.apply_event(RawEvent::ScanningPorts);
    }
    let second = statuses.next().await.map(|status| status.state);
    drop(machine);

    // Then: Each distinct state was published once, then the stream ended
    assert_eq!(first, Some(ConnectionState::CheckingAvailability));
    assert_eq!(second, Some(ConnectionState::ScanningPorts));
    assert_eq!(statuses.next().await, None);
}

#[tokio::test]
async fn test_labels_follow_the_connection() {
    // Given: A pre-baked profile whose server is only known once connected
    let (tunnel, _commands) = ChannelTunnel::new();
    let (mut machine, bridge) = ConnectionStateMachine::new(tunnel, RetryPolicy::default());
    assert_eq!(bridge.label(), StatusLabel::NotConnected);

    // When: Walking through a full connection
    machine.apply_event(RawEvent::CheckingAvailability);
    assert_eq!(bridge.label(), StatusLabel::CheckingAvailability);

    machine.apply_event(RawEvent::Connecting { profile: fastest() });
    assert_eq!(
        bridge.label(),
        StatusLabel::ConnectingTo {
            name: "Fastest".to_string()
        }
    );

    machine.apply_event(RawEvent::Connected { server: zurich() });

    // Then: The server that was picked names the connection
    assert_eq!(
        bridge.label(),
        StatusLabel::ConnectedTo {
            name: "Zurich #4".to_string()
        }
    );
    assert_eq!(bridge.label().to_string(), "Connected to Zurich #4");

    machine.apply_event(RawEvent::WaitingForNetwork);
    assert_eq!(bridge.label(), StatusLabel::ReconnectingNoNetwork);

    machine.apply_event(RawEvent::Disconnecting);
    assert_eq!(bridge.label(), StatusLabel::Disconnecting);
}

#[tokio::test]
async fn test_countdown_label_counts_down_to_reconnect() {
    // Given: A failed attempt with a running countdown
    let (tunnel, mut commands) = ChannelTunnel::new();
    let (mut machine, bridge) = ConnectionStateMachine::new(tunnel, RetryPolicy::default());
    let office = ConnectionProfile::new("office", zurich());
    machine.apply_event(RawEvent::Connecting {
        profile: office.clone(),
    });
    machine.apply_event(RawEvent::fault("UNREACHABLE", ""));

    // When: Ticking the countdown down
    let mut labels = vec![bridge.label().to_string()];
    while let Some(RetryTick::Pending(_)) = machine.tick_retry() {
        labels.push(bridge.label().to_string());
    }

    // Then: The label showed every second and the tunnel was asked to reconnect
    let message = ConnectionFault::Unreachable.message();
    assert_eq!(
        labels,
        vec![
            format!("{} Retrying in 5 seconds", message),
            format!("{} Retrying in 4 seconds", message),
            format!("{} Retrying in 3 seconds", message),
            format!("{} Retrying in 2 seconds", message),
            format!("{} Retrying in 1 second", message),
        ]
    );
    assert_eq!(bridge.status().state, ConnectionState::Connecting);
    assert_eq!(commands.try_recv().unwrap(), TunnelCommand::Reconnect(office));
}

#[tokio::test]
async fn test_multi_user_permission_disconnects() {
    // Given: A connection attempt in progress
    let (tunnel, mut commands) = ChannelTunnel::new();
    let (mut machine, bridge) = ConnectionStateMachine::new(tunnel, RetryPolicy::default());
    machine.apply_event(RawEvent::Connecting {
        profile: ConnectionProfile::new("office", zurich()),
    });

    // When: The permission is held by another user profile
    machine.apply_event(RawEvent::fault("MULTI_USER_PERMISSION", ""));

    // Then: The tunnel is disconnected and no countdown runs
    assert_eq!(commands.try_recv().unwrap(), TunnelCommand::Disconnect);
    assert!(commands.try_recv().is_err());
    assert_eq!(bridge.retry_info(), None);
    assert!(machine.awaiting_acknowledgement());
    assert_eq!(
        bridge.fault(),
        Some(ConnectionFault::MultiUserPermission)
    );
}
