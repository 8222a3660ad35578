//! Configuration module
//!
//! Handles loading and saving client configuration from TOML files.

use crate::types::{ConnectionProfile, Tier};
use serde::{Deserialize, Serialize};

pub mod toml_config;

/// Default support page shown next to faults that link to it
pub const DEFAULT_SUPPORT_URL: &str =
    "https://protonvpn.com/support/solutions-android-vpn-app-issues/";

/// Account settings used by the pre-flight access check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Plan of the signed-in account
    #[serde(default)]
    pub tier: Tier,
}

/// Client configuration structure
///
/// Everything the connection core needs besides the retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Support page for faults that show a support link
    #[serde(default = "default_support_url")]
    pub support_url: String,

    /// Account settings
    #[serde(default)]
    pub account: AccountConfig,

    /// Known connection profiles
    #[serde(default)]
    pub profiles: Vec<ConnectionProfile>,
}

fn default_support_url() -> String {
    DEFAULT_SUPPORT_URL.to_string()
}

impl ClientConfig {
    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.support_url.is_empty() {
            return Err("Support URL cannot be empty".to_string());
        }

        if !self.support_url.starts_with("https://") && !self.support_url.starts_with("http://") {
            return Err("Support URL must use http or https".to_string());
        }

        for (index, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;

            if self.profiles[..index]
                .iter()
                .any(|other| other.name == profile.name)
            {
                return Err(format!("Duplicate profile name: {}", profile.name));
            }
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            support_url: default_support_url(),
            account: AccountConfig::default(),
            profiles: Vec::new(),
        }
    }
}
