//! Configuration status command

use colored::Colorize;
use std::path::PathBuf;
use tunnelwatch_core::error::TunnelwatchError;
use tunnelwatch_core::vpn::access::{check_access, TierEntitlements};

/// Run the status command
///
/// Prints the effective retry policy and whether each profile can be
/// connected to with the configured account.
pub fn run_status(config: Option<PathBuf>) -> Result<(), TunnelwatchError> {
    let (path, config) = super::load(config)?;
    let policy = config.retry_policy();
    let entitlements = TierEntitlements::new(config.client.account.tier);

    println!("Config:   {}", path.display());
    println!("Account:  {}", config.client.account.tier);
    println!("Support:  {}", config.client.support_url);
    println!(
        "Retry:    {}s base, x{} backoff, {}s max, {} attempts",
        policy.base_timeout_secs,
        policy.backoff_multiplier,
        policy.max_timeout_secs,
        policy.max_attempts
    );

    if config.client.profiles.is_empty() {
        println!("Profiles: none");
        return Ok(());
    }

    println!("Profiles:");
    for profile in &config.client.profiles {
        let server = profile
            .server
            .as_ref()
            .map(|server| server.display_name().to_string())
            .unwrap_or_else(|| "fastest".to_string());

        let access = match check_access(profile, &entitlements) {
            Ok(()) => "available".green(),
            Err(e) => e.to_string().red(),
        };

        println!("  {:<16} {:<20} {}", profile.name, server, access);
    }

    Ok(())
}
