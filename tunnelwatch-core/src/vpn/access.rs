//! Pre-flight access check for connection requests
//!
//! A request for a server the account cannot use never reaches the tunnel
//! and never enters the state machine: it is rejected up front so the
//! client can offer an upgrade or explain the maintenance.

use crate::error::ConnectError;
use crate::types::{ConnectionProfile, Server, Tier};

/// Account entitlements, provided by the account layer
pub trait Entitlements {
    fn has_access_to(&self, server: &Server) -> bool;
}

/// Entitlements derived from the account's plan alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEntitlements {
    tier: Tier,
}

impl TierEntitlements {
    pub fn new(tier: Tier) -> Self {
        Self { tier }
    }
}

impl Entitlements for TierEntitlements {
    fn has_access_to(&self, server: &Server) -> bool {
        self.tier >= server.tier
    }
}

/// Check whether a profile may be connected to
///
/// Profiles without a server are always allowed: the tunnel picks one the
/// account can use.
pub fn check_access<E: Entitlements + ?Sized>(
    profile: &ConnectionProfile,
    entitlements: &E,
) -> Result<(), ConnectError> {
    let Some(ref server) = profile.server else {
        return Ok(());
    };

    if !server.online {
        return Err(ConnectError::ServerInMaintenance);
    }

    if !entitlements.has_access_to(server) {
        return Err(ConnectError::UpgradeRequired {
            secure_core: server.secure_core,
            plus: server.is_plus(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_for(server: Server) -> ConnectionProfile {
        ConnectionProfile::new("target", server)
    }

    #[test]
    fn test_profile_without_server_is_allowed() {
        let free = TierEntitlements::new(Tier::Free);
        assert!(check_access(&ConnectionProfile::named("fastest"), &free).is_ok());
    }

    #[test]
    fn test_plus_server_requires_upgrade() {
        let server = Server {
            tier: Tier::Plus,
            ..Server::new("US-NY#9")
        };
        let free = TierEntitlements::new(Tier::Free);
        assert_eq!(
            check_access(&profile_for(server.clone()), &free),
            Err(ConnectError::UpgradeRequired {
                secure_core: false,
                plus: true
            })
        );

        let plus = TierEntitlements::new(Tier::Plus);
        assert!(check_access(&profile_for(server), &plus).is_ok());
    }

    #[test]
    fn test_secure_core_flag_is_reported() {
        let server = Server {
            tier: Tier::Plus,
            secure_core: true,
            ..Server::new("IS-CH#1")
        };
        let basic = TierEntitlements::new(Tier::Basic);
        assert_eq!(
            check_access(&profile_for(server), &basic),
            Err(ConnectError::UpgradeRequired {
                secure_core: true,
                plus: true
            })
        );
    }

    #[test]
    fn test_offline_server_is_in_maintenance() {
        let server = Server {
            online: false,
            ..Server::new("CH#4")
        };
        let visionary = TierEntitlements::new(Tier::Visionary);
        assert_eq!(
            check_access(&profile_for(server), &visionary),
            Err(ConnectError::ServerInMaintenance)
        );
    }
}
