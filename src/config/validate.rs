// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DepwatchError, Result};
use crate::types::WatchLogLevel;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DepwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let log_watch = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, log_watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<WatchLogLevel> {
    let log_watch = validate_log_watch(cfg)?;
    ensure_has_entries(cfg)?;
    validate_bundler(cfg)?;
    validate_entries(cfg)?;
    Ok(log_watch)
}

fn validate_log_watch(cfg: &RawConfigFile) -> Result<WatchLogLevel> {
    cfg.config
        .log_watch
        .parse::<WatchLogLevel>()
        .map_err(DepwatchError::ConfigError)
}

fn ensure_has_entries(cfg: &RawConfigFile) -> Result<()> {
    if cfg.entry.is_empty() {
        return Err(DepwatchError::ConfigError(
            "config must contain at least one [[entry]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_bundler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.bundler.cmd.trim().is_empty() {
        return Err(DepwatchError::ConfigError(
            "[bundler].cmd must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_entries(cfg: &RawConfigFile) -> Result<()> {
    for entry in &cfg.entry {
        Glob::new(&entry.pattern)?;

        if let Some(profile) = &entry.profile {
            if !cfg.profile.contains_key(profile) {
                return Err(DepwatchError::ConfigError(format!(
                    "entry '{}' references unknown profile '{}'",
                    entry.pattern, profile
                )));
            }
        }
    }
    Ok(())
}
