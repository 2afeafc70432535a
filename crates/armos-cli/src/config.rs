//! Configuration – reads/writes `~/.armos/config.toml`.

use std::fs;
use std::path::PathBuf;

use armos_types::ArmError;
use serde::{Deserialize, Serialize};

/// Persisted configuration for the `armos` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Require a human yes/no confirmation before executing any motion
    /// plan.  Off means every plan is auto-approved; leave this on for any
    /// run that moves a physical arm.
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,

    /// Status heartbeat period in milliseconds.
    #[serde(default = "default_status_period_ms")]
    pub status_period_ms: u64,

    /// Depth of the bounded inbound command queue; commands arriving while
    /// it is full are rejected as busy.
    #[serde(default = "default_command_queue_depth")]
    pub command_queue_depth: usize,

    /// Settle pause between chained motions and around scene rebuilds,
    /// in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Period of the simulated perception feed in milliseconds.
    #[serde(default = "default_sim_feed_period_ms")]
    pub sim_feed_period_ms: u64,
}

fn default_require_confirmation() -> bool {
    true
}
fn default_status_period_ms() -> u64 {
    100
}
fn default_command_queue_depth() -> usize {
    8
}
fn default_settle_ms() -> u64 {
    1000
}
fn default_sim_feed_period_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            require_confirmation: default_require_confirmation(),
            status_period_ms: default_status_period_ms(),
            command_queue_depth: default_command_queue_depth(),
            settle_ms: default_settle_ms(),
            sim_feed_period_ms: default_sim_feed_period_ms(),
        }
    }
}

/// Return the path to `~/.armos/config.toml`, honouring `ARMOS_CONFIG`.
pub fn config_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("ARMOS_CONFIG") {
        return PathBuf::from(explicit);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armos").join("config.toml")
}

/// Load the configuration.  `Ok(None)` when no file exists yet.
pub fn load() -> Result<Option<Config>, ArmError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, ArmError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| ArmError::Config(format!("failed to read {}: {e}", path.display())))?;
    let config = toml::from_str(&raw)
        .map_err(|e| ArmError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(config))
}

/// Write the configuration, creating the parent directory if needed.
pub fn save(config: &Config) -> Result<(), ArmError> {
    save_to(config, &config_path())
}

pub(crate) fn save_to(config: &Config, path: &PathBuf) -> Result<(), ArmError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ArmError::Config(format!("failed to create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(config)
        .map_err(|e| ArmError::Config(format!("failed to serialise config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| ArmError::Config(format!("failed to write {}: {e}", path.display())))
}
