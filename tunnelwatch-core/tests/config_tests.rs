//! Tests for configuration file loading

use std::fs;
use tempfile::TempDir;
use tunnelwatch_core::config::toml_config::{
    load_config_from_path, load_config_or_default, save_config_to_path, TomlConfig,
};
use tunnelwatch_core::config::DEFAULT_SUPPORT_URL;
use tunnelwatch_core::error::{ConfigError, TunnelwatchError};
use tunnelwatch_core::types::Tier;
use tunnelwatch_core::vpn::RetryPolicy;

const FULL_CONFIG: &str = r#"
[client]
support_url = "https://support.example.com/vpn"

[client.account]
tier = "plus"

[[client.profiles]]
name = "office"
display_name = "Office"

[client.profiles.server]
name = "CH#4"
display_name = "Zurich #4"
tier = "plus"

[[client.profiles]]
name = "fastest"
pre_baked = true

[retry]
base_timeout_secs = 3
backoff_multiplier = 3
max_timeout_secs = 30
max_attempts = 4
"#;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

#[test]
fn test_load_full_config() {
    // Given: A configuration with every section filled in
    let (_dir, path) = write_config(FULL_CONFIG);

    // When: Loading it
    let config = load_config_from_path(&path).unwrap();

    // Then: Client settings and profiles are read
    assert_eq!(config.client.support_url, "https://support.example.com/vpn");
    assert_eq!(config.client.account.tier, Tier::Plus);
    assert_eq!(config.client.profiles.len(), 2);

    let office = config.client.profile("office").unwrap();
    let server = office.server.as_ref().unwrap();
    assert_eq!(office.display_name, "Office");
    assert_eq!(server.display_name(), "Zurich #4");
    assert_eq!(server.tier, Tier::Plus);
    assert!(server.online, "servers are online unless stated otherwise");

    let fastest = config.client.profile("fastest").unwrap();
    assert!(fastest.pre_baked);
    assert!(fastest.server.is_none());

    // And: The retry policy drives the countdown lengths
    let policy = config.retry_policy();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.timeout_for_attempt(1), 3);
    assert_eq!(policy.timeout_for_attempt(2), 9);
    assert_eq!(policy.timeout_for_attempt(3), 27);
    assert_eq!(policy.timeout_for_attempt(4), 30);
}

#[test]
fn test_empty_file_uses_defaults() {
    // Given: An empty configuration file
    let (_dir, path) = write_config("");

    // When: Loading it
    let config = load_config_from_path(&path).unwrap();

    // Then: Every setting has its default
    assert_eq!(config.client.support_url, DEFAULT_SUPPORT_URL);
    assert_eq!(config.client.account.tier, Tier::Free);
    assert!(config.client.profiles.is_empty());
    assert!(config.retry.is_none());
    assert_eq!(config.retry_policy(), RetryPolicy::default());
}

#[test]
fn test_partial_retry_section_fills_defaults() {
    let (_dir, path) = write_config("[retry]\nmax_attempts = 2\n");

    let policy = load_config_from_path(&path).unwrap().retry_policy();

    assert_eq!(policy.max_attempts, 2);
    assert_eq!(policy.base_timeout_secs, RetryPolicy::default().base_timeout_secs);
    assert_eq!(policy.max_timeout_secs, RetryPolicy::default().max_timeout_secs);
}

#[test]
fn test_invalid_files_are_validation_errors() {
    let cases = [
        ("[retry]\nmax_attempts = 0\n", "Invalid retry policy"),
        ("[retry]\nbase_timeout_secs = 30\nmax_timeout_secs = 10\n", "Invalid retry policy"),
        ("[client.account]\ntier = \"gold\"\n", "Failed to parse config file"),
        ("[[client.profiles]]\nname = \"two words\"\n", "cannot contain whitespace"),
        (
            "[[client.profiles]]\nname = \"home\"\n[[client.profiles]]\nname = \"home\"\n",
            "Duplicate profile name",
        ),
        ("[client\n", "Failed to parse config file"),
    ];

    for (contents, expected) in cases {
        // Given: A broken configuration file
        let (_dir, path) = write_config(contents);

        // When: Loading it
        let err = load_config_from_path(&path).unwrap_err();

        // Then: It is reported as a validation error naming the problem
        assert!(
            matches!(
                err,
                TunnelwatchError::Config(ConfigError::ValidationError { .. })
            ),
            "unexpected error for {:?}: {:?}",
            contents,
            err
        );
        assert!(
            err.to_string().contains(expected),
            "{:?} should mention {:?}, got {}",
            contents,
            expected,
            err
        );
    }
}

#[test]
fn test_missing_file_falls_back_only_when_absent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");

    // Given: No file at all
    assert_eq!(load_config_or_default(&path).unwrap(), TomlConfig::default());

    // Given: A file that exists but is broken
    fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();
    assert!(load_config_or_default(&path).is_err());
}

#[test]
fn test_saved_config_loads_back() {
    // Given: A configuration loaded from a full file
    let (_dir, path) = write_config(FULL_CONFIG);
    let original = load_config_from_path(&path).unwrap();

    // When: Saving it somewhere else and loading it again
    let temp_dir = tempfile::tempdir().unwrap();
    let copy = temp_dir.path().join("sub").join("config.toml");
    save_config_to_path(&original, &copy).unwrap();

    // Then: Nothing is lost
    assert_eq!(load_config_from_path(&copy).unwrap(), original);
}
