//! Classification of tunnel faults
//!
//! The tunnel daemon reports failures as a raw code plus an optional free
//! form description. `classify` maps every possible code to one of a fixed
//! set of faults and the action the client takes for it. The mapping is
//! total: codes we do not know degrade to `ConnectionFault::Unspecified`.

use serde::{Deserialize, Serialize};

/// Typed representation of a raw tunnel failure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionFault {
    /// Credentials were rejected
    AuthFailed,

    /// The gateway could not prove its identity
    PeerAuthFailed,

    /// The gateway address could not be resolved
    LookupFailed,

    /// The gateway did not answer
    Unreachable,

    /// The account already uses all of its sessions
    MaxSessions,

    /// The account has an overdue payment
    Unpaid,

    /// The VPN permission is held by another user profile on the device
    MultiUserPermission,

    /// The local tunnel agent failed; `description` is shown verbatim
    LocalAgentError { description: String },

    /// Anything the classifier does not recognize
    Unspecified,
}

/// What the client does when a fault is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultAction {
    /// Show a credential style error the user has to dismiss
    PromptCredentialError,

    /// Show the error panel and count down to an automatic retry
    ShowBlockingDialog,

    /// Tear the tunnel down and show an error the user has to dismiss
    ForceDisconnectAndPromptError,

    /// Nothing is shown; the fault is only logged and retried
    SilentlyRecordOnly,
}

impl FaultAction {
    /// Whether the fault is followed by an automatic retry countdown
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FaultAction::ShowBlockingDialog | FaultAction::SilentlyRecordOnly
        )
    }

    /// Whether the user must dismiss the error before connecting again
    pub fn requires_acknowledgement(&self) -> bool {
        matches!(
            self,
            FaultAction::PromptCredentialError | FaultAction::ForceDisconnectAndPromptError
        )
    }

    /// Whether entering the fault immediately disconnects the tunnel
    pub fn forces_disconnect(&self) -> bool {
        matches!(self, FaultAction::ForceDisconnectAndPromptError)
    }
}

/// Classify a raw fault code reported by the tunnel daemon
///
/// Codes are matched case-insensitively. Only `LOCAL_AGENT_ERROR` keeps the
/// description; every other fault has a fixed message.
pub fn classify(code: &str, description: &str) -> (ConnectionFault, FaultAction) {
    let fault = ConnectionFault::from_code(code, description);
    let action = fault.action();
    (fault, action)
}

impl ConnectionFault {
    /// Build the fault for a raw code
    pub fn from_code(code: &str, description: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "AUTH_FAILED" => ConnectionFault::AuthFailed,
            "PEER_AUTH_FAILED" => ConnectionFault::PeerAuthFailed,
            "LOOKUP_FAILED" => ConnectionFault::LookupFailed,
            "UNREACHABLE" => ConnectionFault::Unreachable,
            "MAX_SESSIONS" => ConnectionFault::MaxSessions,
            "UNPAID" => ConnectionFault::Unpaid,
            "MULTI_USER_PERMISSION" => ConnectionFault::MultiUserPermission,
            "LOCAL_AGENT_ERROR" => ConnectionFault::LocalAgentError {
                description: description.to_string(),
            },
            _ => ConnectionFault::Unspecified,
        }
    }

    /// The raw code this fault is reported under
    pub fn code(&self) -> &'static str {
        match self {
            ConnectionFault::AuthFailed => "AUTH_FAILED",
            ConnectionFault::PeerAuthFailed => "PEER_AUTH_FAILED",
            ConnectionFault::LookupFailed => "LOOKUP_FAILED",
            ConnectionFault::Unreachable => "UNREACHABLE",
            ConnectionFault::MaxSessions => "MAX_SESSIONS",
            ConnectionFault::Unpaid => "UNPAID",
            ConnectionFault::MultiUserPermission => "MULTI_USER_PERMISSION",
            ConnectionFault::LocalAgentError { .. } => "LOCAL_AGENT_ERROR",
            ConnectionFault::Unspecified => "UNSPECIFIED",
        }
    }

    /// The action taken when this fault is entered
    pub fn action(&self) -> FaultAction {
        match self {
            ConnectionFault::AuthFailed | ConnectionFault::Unpaid => {
                FaultAction::PromptCredentialError
            }
            ConnectionFault::PeerAuthFailed
            | ConnectionFault::LookupFailed
            | ConnectionFault::Unreachable
            | ConnectionFault::Unspecified => FaultAction::ShowBlockingDialog,
            ConnectionFault::MaxSessions => FaultAction::SilentlyRecordOnly,
            ConnectionFault::MultiUserPermission | ConnectionFault::LocalAgentError { .. } => {
                FaultAction::ForceDisconnectAndPromptError
            }
        }
    }

    /// Whether the support link is shown next to the error
    pub fn shows_support_link(&self) -> bool {
        matches!(self, ConnectionFault::LookupFailed)
    }

    /// User facing message
    pub fn message(&self) -> String {
        match self {
            ConnectionFault::AuthFailed => {
                "Authentication failed. Please check your username and password.".to_string()
            }
            ConnectionFault::PeerAuthFailed => {
                "Could not verify the identity of the VPN server.".to_string()
            }
            ConnectionFault::LookupFailed => {
                "Could not resolve the VPN server address.".to_string()
            }
            ConnectionFault::Unreachable => "The VPN server is unreachable.".to_string(),
            ConnectionFault::MaxSessions => {
                "All VPN sessions of this account are in use.".to_string()
            }
            ConnectionFault::Unpaid => {
                "Your account has an overdue payment. Settle the balance to continue using the VPN."
                    .to_string()
            }
            ConnectionFault::MultiUserPermission => {
                "The VPN permission is held by another user profile on this device.".to_string()
            }
            ConnectionFault::LocalAgentError { description } => {
                format!("The tunnel agent reported an error: {}", description)
            }
            ConnectionFault::Unspecified => {
                "Connection failed for an unknown reason.".to_string()
            }
        }
    }

    /// Diagnostic recorded in the logs when the fault is entered
    ///
    /// Credential failures are the user's input, not a client problem, and
    /// record nothing.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            ConnectionFault::AuthFailed => None,
            ConnectionFault::PeerAuthFailed => {
                Some("Peer auth: verifying gateway authentication failed".to_string())
            }
            ConnectionFault::LookupFailed => Some("Gateway address lookup failed".to_string()),
            ConnectionFault::Unreachable => Some("Gateway is unreachable".to_string()),
            ConnectionFault::MaxSessions => Some("Maximum number of sessions used".to_string()),
            ConnectionFault::Unpaid => Some("Overdue payment".to_string()),
            ConnectionFault::MultiUserPermission => {
                Some("Multi-user permission error".to_string())
            }
            ConnectionFault::LocalAgentError { description } => {
                Some(format!("Local agent error: {}", description))
            }
            ConnectionFault::Unspecified => {
                Some("Unspecified failure while connecting".to_string())
            }
        }
    }
}

impl std::fmt::Display for ConnectionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionFault::LocalAgentError { description } => {
                write!(f, "{} ({})", self.code(), description)
            }
            _ => write!(f, "{}", self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let cases = [
            ("AUTH_FAILED", ConnectionFault::AuthFailed, FaultAction::PromptCredentialError),
            ("PEER_AUTH_FAILED", ConnectionFault::PeerAuthFailed, FaultAction::ShowBlockingDialog),
            ("LOOKUP_FAILED", ConnectionFault::LookupFailed, FaultAction::ShowBlockingDialog),
            ("UNREACHABLE", ConnectionFault::Unreachable, FaultAction::ShowBlockingDialog),
            ("MAX_SESSIONS", ConnectionFault::MaxSessions, FaultAction::SilentlyRecordOnly),
            ("UNPAID", ConnectionFault::Unpaid, FaultAction::PromptCredentialError),
            (
                "MULTI_USER_PERMISSION",
                ConnectionFault::MultiUserPermission,
                FaultAction::ForceDisconnectAndPromptError,
            ),
        ];

        for (code, fault, action) in cases {
            assert_eq!(classify(code, ""), (fault, action), "code {}", code);
        }
    }

    #[test]
    fn test_local_agent_error_keeps_description() {
        let (fault, action) = classify("LOCAL_AGENT_ERROR", "handshake did not complete");
        assert_eq!(
            fault,
            ConnectionFault::LocalAgentError {
                description: "handshake did not complete".to_string()
            }
        );
        assert_eq!(action, FaultAction::ForceDisconnectAndPromptError);
        assert!(fault.message().contains("handshake did not complete"));
    }

    #[test]
    fn test_unknown_codes_are_unspecified() {
        for code in ["", "TIMEOUT", "auth failed", "42"] {
            assert_eq!(
                classify(code, "whatever"),
                (ConnectionFault::Unspecified, FaultAction::ShowBlockingDialog)
            );
        }
    }

    #[test]
    fn test_codes_are_case_insensitive() {
        assert_eq!(classify(" lookup_failed ", "").0, ConnectionFault::LookupFailed);
    }

    #[test]
    fn test_support_link_only_for_lookup_failures() {
        assert!(ConnectionFault::LookupFailed.shows_support_link());
        assert!(!ConnectionFault::Unreachable.shows_support_link());
        assert!(!ConnectionFault::Unspecified.shows_support_link());
    }

    #[test]
    fn test_action_flags() {
        assert!(FaultAction::ShowBlockingDialog.is_retryable());
        assert!(FaultAction::SilentlyRecordOnly.is_retryable());
        assert!(!FaultAction::PromptCredentialError.is_retryable());
        assert!(!FaultAction::ForceDisconnectAndPromptError.is_retryable());

        assert!(FaultAction::ForceDisconnectAndPromptError.forces_disconnect());
        assert!(!FaultAction::PromptCredentialError.forces_disconnect());
        assert!(FaultAction::PromptCredentialError.requires_acknowledgement());
    }

    #[test]
    fn test_auth_failure_records_no_diagnostic() {
        assert!(ConnectionFault::AuthFailed.diagnostic().is_none());
        assert!(ConnectionFault::Unreachable.diagnostic().is_some());
    }
}
