// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::bundle::BuildOptions;
use crate::types::{RunMode, WatchLogLevel};

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// base_path = "."
/// single_run = false
/// auto_watch = true
/// auto_watch_batch_delay = 250
/// log_watch = "debug"
///
/// [bundler]
/// cmd = "node scripts/bundle.js {input}"
///
/// [options]
/// output = { format = "iife", sourcemap = "inline" }
///
/// [transform_path]
/// out_dir = "dist"
///
/// [profile.node]
/// options = { plugins = ["node-resolve"] }
///
/// [[entry]]
/// pattern = "test/*.js"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub bundler: BundlerSection,

    /// Global build options, passed through to the bundler.
    #[serde(default)]
    pub options: BuildOptions,

    #[serde(default)]
    pub transform_path: TransformPathConfig,

    /// Named overrides, referenced from `[[entry]]` via `profile = "<name>"`.
    #[serde(default)]
    pub profile: BTreeMap<String, ProfileConfig>,

    #[serde(default)]
    pub entry: Vec<EntryConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Root for entry patterns and relative log paths. Relative values are
    /// resolved against the config file's directory.
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    #[serde(default)]
    pub single_run: bool,

    #[serde(default = "default_auto_watch")]
    pub auto_watch: bool,

    /// Debounce window for change events on the same path, in milliseconds.
    #[serde(default = "default_auto_watch_batch_delay")]
    pub auto_watch_batch_delay: u64,

    /// `"debug"` (default) or `"info"`; validated in [`ConfigFile::try_from`].
    #[serde(default = "default_log_watch")]
    pub log_watch: String,
}

fn default_auto_watch() -> bool {
    true
}

fn default_auto_watch_batch_delay() -> u64 {
    250
}

fn default_log_watch() -> String {
    "debug".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            base_path: None,
            single_run: false,
            auto_watch: default_auto_watch(),
            auto_watch_batch_delay: default_auto_watch_batch_delay(),
            log_watch: default_log_watch(),
        }
    }
}

/// `[bundler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundlerSection {
    /// Shell command; `{input}` is replaced by the entry path.
    #[serde(default)]
    pub cmd: String,
}

/// `[transform_path]`: where a bundle for an entry is written.
///
/// With neither field set, the output path equals the input path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransformPathConfig {
    /// Directory (relative to the base path) that mirrors the entry layout.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    /// Replacement file extension, e.g. `"bundle.js"`.
    #[serde(default)]
    pub extension: Option<String>,
}

impl TransformPathConfig {
    pub fn is_identity(&self) -> bool {
        self.out_dir.is_none() && self.extension.is_none()
    }
}

/// `[profile.<name>]`: per-entry overrides layered on the global settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    /// Shallow-merged over the global `[options]`.
    #[serde(default)]
    pub options: BuildOptions,
    /// Replaces the global `[transform_path]` when present.
    #[serde(default)]
    pub transform_path: Option<TransformPathConfig>,
}

/// `[[entry]]`: a glob of entry files, relative to the base path.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryConfig {
    pub pattern: String,
    #[serde(default)]
    pub profile: Option<String>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (see
/// `validate.rs`), so every instance has a known `log_watch` level, at least
/// one entry and only existing profile references.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    raw: RawConfigFile,
    log_watch: WatchLogLevel,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, log_watch: WatchLogLevel) -> Self {
        Self { raw, log_watch }
    }

    pub fn section(&self) -> &ConfigSection {
        &self.raw.config
    }

    pub fn bundler(&self) -> &BundlerSection {
        &self.raw.bundler
    }

    pub fn options(&self) -> &BuildOptions {
        &self.raw.options
    }

    pub fn transform_path(&self) -> &TransformPathConfig {
        &self.raw.transform_path
    }

    pub fn profiles(&self) -> &BTreeMap<String, ProfileConfig> {
        &self.raw.profile
    }

    pub fn entries(&self) -> &[EntryConfig] {
        &self.raw.entry
    }

    pub fn log_watch(&self) -> WatchLogLevel {
        self.log_watch
    }

    pub fn run_mode(&self) -> RunMode {
        RunMode::from_flags(self.raw.config.single_run, self.raw.config.auto_watch)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.raw.config.auto_watch_batch_delay)
    }

    /// Force single-run mode (CLI `--single-run` / `--no-watch`).
    pub fn set_single_run(&mut self) {
        self.raw.config.single_run = true;
    }

    /// Effective options and path transform config for `profile`.
    pub fn profile_settings(
        &self,
        profile: Option<&str>,
    ) -> (BuildOptions, &TransformPathConfig) {
        match profile.and_then(|name| self.raw.profile.get(name)) {
            Some(p) => (
                crate::bundle::merge_options(&self.raw.options, &p.options),
                p.transform_path.as_ref().unwrap_or(&self.raw.transform_path),
            ),
            None => (self.raw.options.clone(), &self.raw.transform_path),
        }
    }
}
