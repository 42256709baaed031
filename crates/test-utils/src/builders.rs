#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;

use depwatch::bundle::BuildOptions;
use depwatch::config::{
    BundlerSection, ConfigFile, ConfigSection, EntryConfig, ProfileConfig, RawConfigFile,
    TransformPathConfig,
};
use depwatch::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts out valid apart from the missing `[[entry]]`: the bundler command
/// defaults to `bundle {input}` and every `[config]` value to its default.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                bundler: BundlerSection {
                    cmd: "bundle {input}".to_string(),
                },
                options: BuildOptions::new(),
                transform_path: TransformPathConfig::default(),
                profile: BTreeMap::new(),
                entry: Vec::new(),
            },
        }
    }

    pub fn with_entry(mut self, pattern: &str) -> Self {
        self.config.entry.push(EntryConfig {
            pattern: pattern.to_string(),
            profile: None,
        });
        self
    }

    pub fn with_profiled_entry(mut self, pattern: &str, profile: &str) -> Self {
        self.config.entry.push(EntryConfig {
            pattern: pattern.to_string(),
            profile: Some(profile.to_string()),
        });
        self
    }

    pub fn with_profile(mut self, name: &str, profile: ProfileConfig) -> Self {
        self.config.profile.insert(name.to_string(), profile);
        self
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.config.options.insert(key.to_string(), value);
        self
    }

    pub fn with_bundler_cmd(mut self, cmd: &str) -> Self {
        self.config.bundler.cmd = cmd.to_string();
        self
    }

    pub fn with_out_dir(mut self, dir: &str) -> Self {
        self.config.transform_path.out_dir = Some(PathBuf::from(dir));
        self
    }

    pub fn with_log_watch(mut self, level: &str) -> Self {
        self.config.config.log_watch = level.to_string();
        self
    }

    pub fn single_run(mut self, val: bool) -> Self {
        self.config.config.single_run = val;
        self
    }

    pub fn auto_watch(mut self, val: bool) -> Self {
        self.config.config.auto_watch = val;
        self
    }

    pub fn batch_delay_ms(mut self, ms: u64) -> Self {
        self.config.config.auto_watch_batch_delay = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProfileConfig`.
#[derive(Default)]
pub struct ProfileBuilder {
    profile: ProfileConfig,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, key: &str, value: Value) -> Self {
        self.profile.options.insert(key.to_string(), value);
        self
    }

    pub fn out_dir(mut self, dir: &str) -> Self {
        let transform = self.profile.transform_path.get_or_insert_with(Default::default);
        transform.out_dir = Some(PathBuf::from(dir));
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        let transform = self.profile.transform_path.get_or_insert_with(Default::default);
        transform.extension = Some(ext.to_string());
        self
    }

    pub fn build(self) -> ProfileConfig {
        self.profile
    }
}
