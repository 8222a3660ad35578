//! Connection targets as seen by the core
//!
//! Profiles and servers are owned by the rest of the client. The core only
//! reads them: to name the connection target in status labels, to pass the
//! right profile back to the tunnel on reconnect, and to decide whether the
//! account may use a server at all.

use serde::{Deserialize, Serialize};

/// Service plan, ordered from least to most privileged
///
/// Used both for the account's plan and for the minimum plan a server requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Basic,
    Plus,
    Visionary,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Basic => write!(f, "basic"),
            Tier::Plus => write!(f, "plus"),
            Tier::Visionary => write!(f, "visionary"),
        }
    }
}

/// A VPN server a profile can point at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique server name (e.g. "CH#4")
    pub name: String,

    /// Human readable name, falls back to `name` when absent
    #[serde(default)]
    pub display_name: Option<String>,

    /// Minimum plan required to use this server
    #[serde(default)]
    pub tier: Tier,

    /// Whether the server currently accepts connections
    #[serde(default = "default_online")]
    pub online: bool,

    /// Whether traffic is routed through a secure core entry server
    #[serde(default)]
    pub secure_core: bool,
}

fn default_online() -> bool {
    true
}

impl Server {
    /// Create an online free-tier server with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            tier: Tier::Free,
            online: true,
            secure_core: false,
        }
    }

    /// Name to show to the user
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }

    /// Whether the server belongs to the plus plan or above
    pub fn is_plus(&self) -> bool {
        self.tier >= Tier::Plus
    }
}

/// A connection target chosen by the user or by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Unique profile name
    pub name: String,

    /// Name shown to the user, may be empty
    #[serde(default)]
    pub display_name: String,

    /// Built-in profiles ("fastest", "random") whose name says nothing
    /// about the server that was eventually picked
    #[serde(default)]
    pub pre_baked: bool,

    /// Target server; `None` lets the tunnel pick one
    #[serde(default)]
    pub server: Option<Server>,
}

impl ConnectionProfile {
    /// Create a profile targeting a specific server
    pub fn new(name: impl Into<String>, server: Server) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            pre_baked: false,
            server: Some(server),
        }
    }

    /// Create a profile that only carries a name
    ///
    /// Used for profiles the tunnel daemon mentions that are not in the
    /// configured catalog.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            pre_baked: false,
            server: None,
        }
    }

    /// Validate the profile
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Profile name cannot be empty".to_string());
        }

        if self.name.chars().any(char::is_whitespace) {
            return Err(format!("Profile name '{}' cannot contain whitespace", self.name));
        }

        if let Some(ref server) = self.server {
            if server.name.trim().is_empty() {
                return Err(format!("Profile '{}' has a server with an empty name", self.name));
            }
        }

        Ok(())
    }
}
