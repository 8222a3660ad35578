//! Connection monitor command
//!
//! Reads tunnel daemon status lines from stdin, feeds them to the connection
//! monitor and prints every status change, countdown step, notice and
//! tunnel command as it happens. Lines starting with `!` are user actions:
//! `!connect <profile>`, `!disconnect`, `!ack`, `!cancel` and `!retry`.
//! The monitor stops at end of input or on Ctrl+C.

use chrono::Local;
use colored::Colorize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tunnelwatch_core::config::toml_config::TomlConfig;
use tunnelwatch_core::error::TunnelwatchError;
use tunnelwatch_core::types::ConnectionProfile;
use tunnelwatch_core::vpn::access::TierEntitlements;
use tunnelwatch_core::vpn::{
    ChannelTunnel, ConnectionMonitor, EventParser, Notice, RetryInfo, Status, StatusLabel,
    TunnelCommand,
};
use tracing::{debug, info};

/// User action typed on stdin
#[derive(Debug, Clone, PartialEq, Eq)]
enum UserAction {
    Connect(String),
    Disconnect,
    Acknowledge,
    CancelRetry,
    RetryNow,
}

/// Parse a `!`-prefixed user action
fn parse_action(line: &str) -> Option<UserAction> {
    let rest = line.trim().strip_prefix('!')?;
    let mut parts = rest.split_whitespace();

    match (parts.next()?, parts.next()) {
        ("connect", Some(name)) => Some(UserAction::Connect(name.to_string())),
        ("disconnect", None) => Some(UserAction::Disconnect),
        ("ack", None) => Some(UserAction::Acknowledge),
        ("cancel", None) => Some(UserAction::CancelRetry),
        ("retry", None) => Some(UserAction::RetryNow),
        _ => None,
    }
}

/// Run the monitor command
pub fn run_monitor(config: Option<PathBuf>, json: bool) -> Result<(), TunnelwatchError> {
    let (_, config) = super::load(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(monitor_stdin(config, json))
}

async fn monitor_stdin(config: TomlConfig, json: bool) -> Result<(), TunnelwatchError> {
    let printer = Printer {
        json,
        support_url: config.client.support_url.clone(),
    };
    let parser = EventParser::new(config.client.profiles.clone());

    let (tunnel, mut tunnel_rx) = ChannelTunnel::new();
    let monitor = ConnectionMonitor::spawn(
        tunnel,
        config.retry_policy(),
        TierEntitlements::new(config.client.account.tier),
    );

    let bridge = monitor.bridge();
    let mut statuses = bridge.subscribe();
    let mut retries = bridge.subscribe_retry();
    let mut notices = bridge.subscribe_notices();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Reading tunnel status lines from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };

                if let Some(action) = parse_action(&line) {
                    perform(&monitor, &config, &printer, action).await?;
                } else if let Some(event) = parser.parse_line(&line) {
                    monitor.on_raw_event(event)?;
                }
            }

            Some(status) = statuses.next() => printer.status(&status, bridge.retry_info()),

            Ok(()) = retries.changed() => {
                let retry = *retries.borrow_and_update();
                if let Some(retry) = retry {
                    printer.retry(retry);
                }
            }

            Ok(notice) = notices.recv() => printer.notice(&notice),

            Some(command) = tunnel_rx.recv() => printer.command(&command),

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping monitor");
                break;
            }
        }
    }

    monitor.shutdown().await;

    // Report what happened between the last print and the shutdown
    while let Some(status) = statuses.next().await {
        printer.status(&status, None);
    }
    while let Ok(notice) = notices.try_recv() {
        printer.notice(&notice);
    }
    while let Some(command) = tunnel_rx.recv().await {
        printer.command(&command);
    }

    Ok(())
}

async fn perform(
    monitor: &ConnectionMonitor,
    config: &TomlConfig,
    printer: &Printer,
    action: UserAction,
) -> Result<(), TunnelwatchError> {
    debug!(?action, "User action");

    match action {
        UserAction::Connect(name) => {
            let profile = config
                .client
                .profile(&name)
                .cloned()
                .unwrap_or_else(|| ConnectionProfile::named(name));

            if let Err(e) = monitor.connect(profile).await {
                printer.rejected(&e);
            }
        }
        UserAction::Disconnect => monitor.disconnect()?,
        UserAction::Acknowledge => monitor.acknowledge_error()?,
        UserAction::CancelRetry => monitor.cancel_retry()?,
        UserAction::RetryNow => monitor.retry_now()?,
    }

    Ok(())
}

/// Renders monitor output as text or JSON lines
struct Printer {
    json: bool,
    support_url: String,
}

impl Printer {
    fn status(&self, status: &Status, retry: Option<RetryInfo>) {
        let label = StatusLabel::for_status(status, retry);

        if self.json {
            self.emit(serde_json::json!({ "status": status, "label": label }));
            return;
        }

        let text = label.to_string();
        let text = match label {
            StatusLabel::ConnectedTo { .. } => text.green().bold(),
            StatusLabel::Error { .. } => text.red().bold(),
            _ if status.state.is_connecting() => text.yellow(),
            _ => text.dimmed(),
        };
        println!("{} {}", timestamp(), text);

        if let StatusLabel::Error {
            show_support_link: true,
            ..
        } = label
        {
            println!("           Support: {}", self.support_url);
        }
    }

    fn retry(&self, retry: RetryInfo) {
        if self.json {
            self.emit(serde_json::json!({ "retry": retry }));
            return;
        }

        println!(
            "{} {}",
            timestamp(),
            format!(
                "Retrying in {}s (timeout {}s)",
                retry.retry_in_seconds, retry.timeout_seconds
            )
            .dimmed()
        );
    }

    fn notice(&self, notice: &Notice) {
        if self.json {
            self.emit(serde_json::json!({ "notice": notice }));
            return;
        }

        let text = match notice {
            Notice::DisconnectedFromOutside { previous } => {
                format!("Disconnected from outside (was {})", previous)
            }
            Notice::RetriesExhausted { attempts } => {
                format!("Gave up after {} automatic attempts", attempts)
            }
        };
        println!("{} {}", timestamp(), text.magenta());
    }

    fn command(&self, command: &TunnelCommand) {
        if self.json {
            self.emit(serde_json::json!({ "command": command }));
            return;
        }

        let text = match command {
            TunnelCommand::Connect(profile) => format!("-> tunnel: connect {}", profile.name),
            TunnelCommand::Reconnect(profile) => format!("-> tunnel: reconnect {}", profile.name),
            TunnelCommand::Disconnect => "-> tunnel: disconnect".to_string(),
        };
        println!("{} {}", timestamp(), text.cyan());
    }

    fn rejected(&self, error: &TunnelwatchError) {
        if self.json {
            self.emit(serde_json::json!({ "rejected": error.to_string() }));
            return;
        }

        println!("{} {}", timestamp(), format!("✗ {}", error).red());
    }

    fn emit(&self, mut value: serde_json::Value) {
        if let Some(object) = value.as_object_mut() {
            object.insert(
                "time".to_string(),
                serde_json::Value::String(Local::now().to_rfc3339()),
            );
        }
        println!("{}", value);
    }
}

fn timestamp() -> String {
    format!("[{}]", Local::now().format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            parse_action("!connect office"),
            Some(UserAction::Connect("office".to_string()))
        );
        assert_eq!(parse_action(" !disconnect "), Some(UserAction::Disconnect));
        assert_eq!(parse_action("!ack"), Some(UserAction::Acknowledge));
        assert_eq!(parse_action("!cancel"), Some(UserAction::CancelRetry));
        assert_eq!(parse_action("!retry"), Some(UserAction::RetryNow));
    }

    #[test]
    fn test_status_lines_are_not_actions() {
        assert_eq!(parse_action("connecting office"), None);
        assert_eq!(parse_action("!connect"), None);
        assert_eq!(parse_action("!ack now"), None);
        assert_eq!(parse_action("!reboot"), None);
    }
}
