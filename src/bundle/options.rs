// src/bundle/options.rs

use serde_json::{Map, Value};

/// Build options are opaque to depwatch apart from `output.sourcemap`.
pub type BuildOptions = Map<String, Value>;

/// Shallow merge: every top-level key of `overrides` replaces the one in
/// `base`.
pub fn merge_options(base: &BuildOptions, overrides: &BuildOptions) -> BuildOptions {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// True when `output.sourcemap` is `"inline"`.
pub fn wants_inline_source_map(options: &BuildOptions) -> bool {
    options
        .get("output")
        .and_then(|output| output.get("sourcemap"))
        .and_then(Value::as_str)
        == Some("inline")
}
