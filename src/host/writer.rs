// src/host/writer.rs

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::bundle::{FileDescriptor, Preprocessor};
use crate::errors::{DepwatchError, Result};
use crate::fs::FileSystem;
use crate::host::FileList;
use crate::watch::path_utils::normalize;

/// Standalone host: preprocesses entries and writes their bundles.
///
/// Each entry is bundled with the preprocessor of its profile. Source maps
/// that are not inlined are written next to the bundle as `<bundle>.map`.
#[derive(Debug)]
pub struct BundleWriter {
    fs: Arc<dyn FileSystem>,
    preprocessors: HashMap<String, Preprocessor>,
}

impl BundleWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            preprocessors: HashMap::new(),
        }
    }

    /// Register `entry` to be bundled by `preprocessor`.
    pub fn add_entry(&mut self, entry: &str, preprocessor: Preprocessor) {
        self.preprocessors.insert(normalize(entry), preprocessor);
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.preprocessors.keys().map(String::as_str)
    }

    /// Bundle `entry` and write the result. Returns the output path.
    pub async fn write_entry(&self, entry: &str) -> Result<PathBuf> {
        let entry = normalize(entry);
        let preprocessor = self.preprocessors.get(&entry).ok_or_else(|| {
            DepwatchError::Other(anyhow!("'{entry}' is not a configured entry"))
        })?;

        let original_path = Path::new(&entry);
        let output_path = preprocessor.output_path(original_path);
        if output_path == original_path {
            return Err(DepwatchError::ConfigError(format!(
                "bundle for '{entry}' would overwrite the entry itself; set [transform_path]"
            )));
        }

        let original = self.fs.read_to_string(original_path)?;
        let mut file = FileDescriptor::new(original_path);
        let processed = preprocessor.preprocess(&original, &mut file).await?;

        self.fs.write(&file.path, processed.as_bytes())?;

        if let Some(map) = file.source_map.as_ref().filter(|_| !preprocessor.inline_source_map()) {
            let map_path = map_path_for(&file.path);
            let json = map.to_json().map_err(anyhow::Error::from)?;
            self.fs.write(&map_path, json.as_bytes())?;
            debug!(map = %map_path.display(), "wrote external source map");
        }

        info!(entry = %entry, output = %file.path.display(), "bundle written");
        Ok(file.path)
    }
}

fn map_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".map");
    PathBuf::from(name)
}

impl FileList for BundleWriter {
    fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.entries().map(str::to_string).collect();
        files.sort();
        files
    }

    fn mark_changed<'a>(
        &'a self,
        path: &'a str,
        is_rebuild: bool,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            debug!(entry = %path, is_rebuild, "Refresh entries");
            self.write_entry(path).await.map(|_| ())
        })
    }
}
