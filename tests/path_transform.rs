// tests/path_transform.rs

use std::path::{Path, PathBuf};

use depwatch::bundle::sourcemap::append_inline_source_map;
use depwatch::bundle::{BuildOptions, PathTransform, SourceMap, merge_options, wants_inline_source_map};
use depwatch::config::TransformPathConfig;
use depwatch::watch::path_utils::{display_relative, is_virtual, normalize, relative_str};
use serde_json::json;

fn config(out_dir: Option<&str>, extension: Option<&str>) -> TransformPathConfig {
    TransformPathConfig {
        out_dir: out_dir.map(PathBuf::from),
        extension: extension.map(str::to_string),
    }
}

#[test]
fn empty_transform_is_identity() {
    let t = PathTransform::from_config(&config(None, None), Path::new("/p"));
    assert_eq!(t.apply(Path::new("/p/test/a.js")), PathBuf::from("/p/test/a.js"));
}

#[test]
fn out_dir_mirrors_layout_below_base() {
    let t = PathTransform::from_config(&config(Some("dist"), None), Path::new("/p"));
    assert_eq!(
        t.apply(Path::new("/p/test/unit/a.js")),
        PathBuf::from("/p/dist/test/unit/a.js")
    );
}

#[test]
fn extension_is_replaced() {
    let t = PathTransform::from_config(&config(None, Some("bundle.js")), Path::new("/p"));
    assert_eq!(t.apply(Path::new("/p/a.ts")), PathBuf::from("/p/a.bundle.js"));

    let t = PathTransform::from_config(&config(Some("out"), Some("js")), Path::new("/p"));
    assert_eq!(t.apply(Path::new("/p/src/a.ts")), PathBuf::from("/p/out/src/a.js"));
}

#[test]
fn custom_transform_closure() {
    let t = PathTransform::new(|p: &Path| p.with_file_name("index.js"));
    assert_eq!(t.apply(Path::new("/p/a/main.ts")), PathBuf::from("/p/a/index.js"));
}

#[test]
fn normalize_rewrites_backslashes() {
    assert_eq!(normalize(r"C:\work\src\a.js"), "C:/work/src/a.js");
    assert_eq!(normalize("/already/fine.js"), "/already/fine.js");
}

#[test]
fn virtual_ids_are_detected() {
    assert!(is_virtual("\u{0}commonjsHelpers.js"));
    assert!(is_virtual("/p/\u{0}proxy?commonjs"));
    assert!(!is_virtual("/p/a.js"));
}

#[test]
fn log_paths_are_relative_when_possible() {
    assert_eq!(
        relative_str(Path::new("/p"), Path::new("/p/src/a.js")).as_deref(),
        Some("src/a.js")
    );
    assert_eq!(display_relative(Path::new("/p"), "/p/src/a.js"), "src/a.js");
    assert_eq!(display_relative(Path::new("/p"), "/elsewhere/x.js"), "/elsewhere/x.js");
}

#[test]
fn profile_options_override_top_level_keys() {
    let mut base = BuildOptions::new();
    base.insert("output".to_string(), json!({ "format": "iife", "sourcemap": "inline" }));
    base.insert("treeshake".to_string(), json!(true));
    let mut overrides = BuildOptions::new();
    overrides.insert("output".to_string(), json!({ "format": "es" }));

    let merged = merge_options(&base, &overrides);

    assert_eq!(merged["output"], json!({ "format": "es" }), "shallow merge");
    assert_eq!(merged["treeshake"], json!(true));
    assert!(wants_inline_source_map(&base));
    assert!(!wants_inline_source_map(&merged));
}

#[test]
fn inline_map_comment_shape() -> Result<(), serde_json::Error> {
    let map = SourceMap {
        version: 3,
        file: None,
        sources: vec!["a.js".to_string()],
        sources_content: vec![Some("let a;".to_string())],
        names: vec![],
        mappings: "AAAA".to_string(),
    };

    let code = append_inline_source_map("let a;", &map)?;

    assert!(code.starts_with("let a;\n//# sourceMappingURL=data:application/json;charset=utf-8;base64,"));
    assert!(code.ends_with('\n'));
    assert!(map.to_json()?.contains(r#""sourcesContent":["let a;"]"#));
    Ok(())
}
