// src/bundle/transform.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::model::TransformPathConfig;

/// Maps an entry's input path to the path its bundle is served/written at.
#[derive(Clone)]
pub struct PathTransform(Arc<dyn Fn(&Path) -> PathBuf + Send + Sync>);

impl fmt::Debug for PathTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathTransform").finish_non_exhaustive()
    }
}

impl Default for PathTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PathTransform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Path) -> PathBuf + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn identity() -> Self {
        Self::new(Path::to_path_buf)
    }

    /// Build the transform described by a `[transform_path]` table.
    ///
    /// `base` is the directory entries are resolved against; with `out_dir`
    /// set, the entry's path relative to `base` is re-rooted under
    /// `base/out_dir`.
    pub fn from_config(config: &TransformPathConfig, base: &Path) -> Self {
        if config.is_identity() {
            return Self::identity();
        }

        let base = base.to_path_buf();
        let out_dir = config.out_dir.clone();
        let extension = config.extension.clone();

        Self::new(move |input| {
            let mut output = match &out_dir {
                Some(dir) => {
                    let rel = input.strip_prefix(&base).unwrap_or(input);
                    let rel = rel.strip_prefix("/").unwrap_or(rel);
                    base.join(dir).join(rel)
                }
                None => input.to_path_buf(),
            };
            if let Some(ext) = &extension {
                output.set_extension(ext);
            }
            output
        })
    }

    pub fn apply(&self, input: &Path) -> PathBuf {
        (self.0)(input)
    }
}
