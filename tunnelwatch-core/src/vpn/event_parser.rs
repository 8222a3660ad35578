//! Pattern-based parser for tunnel daemon status lines
//!
//! Turns lines such as `connecting office` or `fault LOOKUP_FAILED no such
//! host` into `RawEvent`s. Profile and server names are resolved against the
//! configured profiles.

use crate::types::{ConnectionProfile, Server};
use crate::vpn::event::RawEvent;
use regex::Regex;
use tracing::debug;

/// Parser for tunnel daemon status lines
pub struct EventParser {
    /// Pattern for "disabled"
    disabled_pattern: Regex,
    /// Pattern for "checking availability"
    checking_pattern: Regex,
    /// Pattern for "scanning ports"
    scanning_pattern: Regex,
    /// Pattern for "connecting <profile>"
    connecting_pattern: Regex,
    /// Pattern for "waiting for network"
    waiting_pattern: Regex,
    /// Pattern for "connected <server>"
    connected_pattern: Regex,
    /// Pattern for "disconnecting"
    disconnecting_pattern: Regex,
    /// Pattern for "fault <CODE> [description]"
    fault_pattern: Regex,
    /// Known profiles, used to resolve names
    profiles: Vec<ConnectionProfile>,
}

impl EventParser {
    /// Create a new EventParser resolving names against `profiles`
    pub fn new(profiles: Vec<ConnectionProfile>) -> Self {
        Self {
            disabled_pattern: Regex::new(r"(?i)^disabled$")
                .expect("Failed to compile disabled pattern"),
            checking_pattern: Regex::new(r"(?i)^checking[ _]availability$")
                .expect("Failed to compile checking pattern"),
            scanning_pattern: Regex::new(r"(?i)^scanning[ _]ports$")
                .expect("Failed to compile scanning pattern"),
            connecting_pattern: Regex::new(r"(?i)^connecting\s+(\S+)$")
                .expect("Failed to compile connecting pattern"),
            waiting_pattern: Regex::new(r"(?i)^waiting[ _]for[ _]network$")
                .expect("Failed to compile waiting pattern"),
            connected_pattern: Regex::new(r"(?i)^connected\s+(\S+)$")
                .expect("Failed to compile connected pattern"),
            disconnecting_pattern: Regex::new(r"(?i)^disconnecting$")
                .expect("Failed to compile disconnecting pattern"),
            fault_pattern: Regex::new(r"(?i)^fault\s+(\S+)(?:\s+(.*))?$")
                .expect("Failed to compile fault pattern"),
            profiles,
        }
    }

    /// Parse a status line
    ///
    /// Returns `None` for blank, comment (`#`) and unrecognized lines.
    pub fn parse_line(&self, line: &str) -> Option<RawEvent> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if self.disabled_pattern.is_match(line) {
            return Some(RawEvent::Disabled);
        }

        if self.checking_pattern.is_match(line) {
            return Some(RawEvent::CheckingAvailability);
        }

        if self.scanning_pattern.is_match(line) {
            return Some(RawEvent::ScanningPorts);
        }

        if let Some(captures) = self.connecting_pattern.captures(line) {
            let name = &captures[1];
            return Some(RawEvent::Connecting {
                profile: self.resolve_profile(name),
            });
        }

        if self.waiting_pattern.is_match(line) {
            return Some(RawEvent::WaitingForNetwork);
        }

        if let Some(captures) = self.connected_pattern.captures(line) {
            let name = &captures[1];
            return Some(RawEvent::Connected {
                server: self.resolve_server(name),
            });
        }

        if self.disconnecting_pattern.is_match(line) {
            return Some(RawEvent::Disconnecting);
        }

        if let Some(captures) = self.fault_pattern.captures(line) {
            let description = captures
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            return Some(RawEvent::fault(&captures[1], description));
        }

        debug!(line, "Ignoring unrecognized status line");
        None
    }

    fn resolve_profile(&self, name: &str) -> ConnectionProfile {
        self.profiles
            .iter()
            .find(|profile| profile.name == name)
            .cloned()
            .unwrap_or_else(|| ConnectionProfile::named(name))
    }

    fn resolve_server(&self, name: &str) -> Server {
        self.profiles
            .iter()
            .filter_map(|profile| profile.server.as_ref())
            .find(|server| server.name == name)
            .cloned()
            .unwrap_or_else(|| Server::new(name))
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
