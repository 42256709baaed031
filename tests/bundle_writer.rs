// tests/bundle_writer.rs

mod common;
use crate::common::fakes::{FakeBundler, code_chunk, sample_map};
use crate::common::{TestResult, init_tracing};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use depwatch::bundle::{BuildOptions, OutputChunk, PathTransform};
use depwatch::config::{EntryConfig, TransformPathConfig};
use depwatch::errors::DepwatchError;
use depwatch::fs::FileSystem;
use depwatch::fs::mock::MockFileSystem;
use depwatch::host::{BundleWriter, FileList, ResolvedEntry, resolve_entries};
use depwatch::session::Session;
use depwatch::types::RunMode;

fn entry(pattern: &str, profile: Option<&str>) -> EntryConfig {
    EntryConfig {
        pattern: pattern.to_string(),
        profile: profile.map(str::to_string),
    }
}

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/p/test/a.spec.js", "import './b.js'");
    fs.add_file("/p/test/b.js", "export default 1");
    fs.add_file("/p/test/node/c.spec.js", "require('fs')");
    fs.add_file("/p/README.md", "# readme");
    fs
}

#[test]
fn patterns_resolve_relative_to_base() -> TestResult {
    init_tracing();
    let fs = project();

    let resolved = resolve_entries(&fs, Path::new("/p"), &[entry("test/**/*.spec.js", None)])?;

    assert_eq!(
        resolved,
        vec![
            ResolvedEntry {
                path: "/p/test/a.spec.js".to_string(),
                profile: None,
            },
            ResolvedEntry {
                path: "/p/test/node/c.spec.js".to_string(),
                profile: None,
            },
        ]
    );
    Ok(())
}

#[test]
fn later_entry_overrides_profile_of_earlier_match() -> TestResult {
    let fs = project();

    let resolved = resolve_entries(
        &fs,
        Path::new("/p"),
        &[
            entry("test/**/*.spec.js", None),
            entry("test/node/*.js", Some("node")),
        ],
    )?;

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].profile, None);
    assert_eq!(resolved[1].path, "/p/test/node/c.spec.js");
    assert_eq!(resolved[1].profile.as_deref(), Some("node"));
    Ok(())
}

fn writer_with(
    fs: &MockFileSystem,
    bundler: &FakeBundler,
    options: BuildOptions,
    transform: PathTransform,
    entries: &[&str],
) -> TestResult<BundleWriter> {
    let session = Session::new(RunMode::SingleRun, |_| unreachable!("single run never watches"))?;
    let mut writer = BundleWriter::new(Arc::new(fs.clone()));
    for e in entries {
        let pre = session.preprocessor(Arc::new(bundler.clone()), options.clone(), transform.clone(), "/p");
        writer.add_entry(e, pre);
    }
    Ok(writer)
}

fn dist() -> PathTransform {
    PathTransform::from_config(
        &TransformPathConfig {
            out_dir: Some(PathBuf::from("dist")),
            extension: None,
        },
        Path::new("/p"),
    )
}

#[tokio::test]
async fn bundle_is_written_under_out_dir() -> TestResult {
    init_tracing();
    let fs = project();
    let bundler = FakeBundler::new();
    let writer = writer_with(&fs, &bundler, BuildOptions::new(), dist(), &["/p/test/a.spec.js"])?;

    let out = writer.write_entry("/p/test/a.spec.js").await?;

    assert_eq!(out, PathBuf::from("/p/dist/test/a.spec.js"));
    assert_eq!(
        fs.contents(&out).as_deref(),
        Some("/* bundled /p/test/a.spec.js */")
    );
    assert_eq!(fs.contents("/p/test/a.spec.js").as_deref(), Some("import './b.js'"));
    Ok(())
}

#[tokio::test]
async fn external_map_is_written_next_to_bundle() -> TestResult {
    let fs = project();
    let bundler = FakeBundler::new();
    bundler.set_outputs(
        "/p/test/a.spec.js",
        vec![OutputChunk {
            map: Some(sample_map("test/a.spec.js")),
            ..code_chunk("bundled")
        }],
    );
    let writer = writer_with(&fs, &bundler, BuildOptions::new(), dist(), &["/p/test/a.spec.js"])?;

    writer.write_entry("/p/test/a.spec.js").await?;

    let map = fs
        .contents("/p/dist/test/a.spec.js.map")
        .ok_or("source map not written")?;
    let map: serde_json::Value = serde_json::from_str(&map)?;
    assert_eq!(map["sources"], json!(["test/a.spec.js"]));
    Ok(())
}

#[tokio::test]
async fn inline_map_writes_no_map_file() -> TestResult {
    let fs = project();
    let bundler = FakeBundler::new();
    bundler.set_outputs(
        "/p/test/a.spec.js",
        vec![OutputChunk {
            map: Some(sample_map("test/a.spec.js")),
            ..code_chunk("bundled")
        }],
    );
    let mut options = BuildOptions::new();
    options.insert("output".to_string(), json!({ "sourcemap": "inline" }));
    let writer = writer_with(&fs, &bundler, options, dist(), &["/p/test/a.spec.js"])?;

    writer.write_entry("/p/test/a.spec.js").await?;

    let code = fs.contents("/p/dist/test/a.spec.js").ok_or("bundle not written")?;
    assert!(code.contains("//# sourceMappingURL=data:application/json"));
    assert!(!fs.is_file(Path::new("/p/dist/test/a.spec.js.map")));
    Ok(())
}

#[tokio::test]
async fn writer_refuses_to_overwrite_the_entry() -> TestResult {
    let fs = project();
    let bundler = FakeBundler::new();
    let writer = writer_with(
        &fs,
        &bundler,
        BuildOptions::new(),
        PathTransform::identity(),
        &["/p/test/a.spec.js"],
    )?;

    let result = writer.write_entry("/p/test/a.spec.js").await;

    assert!(matches!(result, Err(DepwatchError::ConfigError(_))));
    assert!(bundler.builds().is_empty());
    assert_eq!(fs.contents("/p/test/a.spec.js").as_deref(), Some("import './b.js'"));
    Ok(())
}

#[tokio::test]
async fn mark_changed_rebundles_the_entry() -> TestResult {
    init_tracing();
    let fs = project();
    let bundler = FakeBundler::new();
    let writer = writer_with(&fs, &bundler, BuildOptions::new(), dist(), &["/p/test/a.spec.js"])?;

    writer.mark_changed("/p/test/a.spec.js", true).await?;
    writer.mark_changed("/p/test/a.spec.js", true).await?;

    assert_eq!(bundler.builds_of("/p/test/a.spec.js").len(), 2);
    Ok(())
}

#[tokio::test]
async fn unknown_entry_is_an_error() -> TestResult {
    let fs = project();
    let bundler = FakeBundler::new();
    let writer = writer_with(&fs, &bundler, BuildOptions::new(), dist(), &[])?;

    assert!(writer.write_entry("/p/test/b.js").await.is_err());
    Ok(())
}
