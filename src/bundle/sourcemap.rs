// src/bundle/sourcemap.rs

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Source map v3 as produced by the bundler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub mappings: String,
}

fn default_version() -> u32 {
    3
}

impl SourceMap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Self-contained `data:` URL form of the map.
    pub fn to_url(&self) -> serde_json::Result<String> {
        let json = self.to_json()?;
        Ok(format!(
            "data:application/json;charset=utf-8;base64,{}",
            STANDARD.encode(json)
        ))
    }
}

/// Append a trailing `//# sourceMappingURL=` comment embedding `map`.
pub fn append_inline_source_map(code: &str, map: &SourceMap) -> serde_json::Result<String> {
    Ok(format!("{code}\n//# sourceMappingURL={}\n", map.to_url()?))
}
