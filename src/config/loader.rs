// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and parse `path` without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    debug!(config = %path.display(), "loading config");
    Ok(toml::from_str(&fs::read_to_string(path)?)?)
}

/// Read, parse and validate `path`.
///
/// Everything is checked before any entry is built or watched: a bad
/// `log_watch` value or a dangling profile reference stops the process at
/// startup.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    ConfigFile::try_from(load_from_path(path)?)
}
