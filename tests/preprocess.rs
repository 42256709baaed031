// tests/preprocess.rs

mod common;
use crate::common::fakes::{FakeBundler, asset_chunk, code_chunk, sample_map};
use crate::common::{TestResult, init_tracing};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tokio::sync::mpsc;

use depwatch::bundle::{
    BuildOptions, CacheStore, FileDescriptor, OutputChunk, PathTransform, Preprocessor,
    describe_build_error,
};
use depwatch::engine::RuntimeEvent;
use depwatch::errors::DepwatchError;

fn inline_options() -> BuildOptions {
    let mut options = BuildOptions::new();
    options.insert("output".to_string(), json!({ "sourcemap": "inline" }));
    options
}

fn preprocessor(
    bundler: &FakeBundler,
    options: BuildOptions,
    reporter: Option<mpsc::Sender<RuntimeEvent>>,
) -> (Preprocessor, Arc<Mutex<CacheStore>>) {
    let cache = Arc::new(Mutex::new(CacheStore::new()));
    let pre = Preprocessor::new(Arc::new(bundler.clone()), options, Arc::clone(&cache), reporter)
        .with_base_path("/p");
    (pre, cache)
}

#[tokio::test]
async fn successful_build_returns_code_and_reports_dependencies() -> TestResult {
    init_tracing();
    let bundler = FakeBundler::new();
    bundler.set_dependencies("/p/a.js", &["/p/b.js", "/p/c.js"]);
    let (tx, mut rx) = mpsc::channel(8);
    let (pre, cache) = preprocessor(&bundler, BuildOptions::new(), Some(tx));

    let mut file = FileDescriptor::new("/p/a.js");
    let code = pre.preprocess("original", &mut file).await?;

    assert_eq!(code, "/* bundled /p/a.js */");
    assert_eq!(file.path, PathBuf::from("/p/a.js"));
    assert_eq!(
        rx.try_recv()?,
        RuntimeEvent::EntryBuilt {
            entry: "/p/a.js".to_string(),
            dependencies: vec!["/p/b.js".to_string(), "/p/c.js".to_string()],
        }
    );
    assert!(cache.lock().unwrap().contains("/p/a.js"));
    Ok(())
}

#[tokio::test]
async fn second_build_receives_previous_cache() -> TestResult {
    init_tracing();
    let bundler = FakeBundler::new();
    let (pre, _cache) = preprocessor(&bundler, BuildOptions::new(), None);

    pre.preprocess("x", &mut FileDescriptor::new("/p/a.js")).await?;
    pre.preprocess("x", &mut FileDescriptor::new("/p/a.js")).await?;

    let builds = bundler.builds_of("/p/a.js");
    assert_eq!(builds.len(), 2);
    assert!(builds[0].cache.is_none());
    let previous = builds[1].cache.as_ref().ok_or("second build got no cache")?;
    assert_eq!(previous.0, json!({ "input": "/p/a.js", "build": 1 }));
    Ok(())
}

#[tokio::test]
async fn empty_bundle_passes_original_through() -> TestResult {
    init_tracing();
    let bundler = FakeBundler::new();
    bundler.set_outputs("/p/a.js", vec![asset_chunk("logo.png")]);
    let (pre, _cache) = preprocessor(&bundler, BuildOptions::new(), None);

    let mut file = FileDescriptor::new("/p/a.js");
    let code = pre.preprocess("console.log(1)", &mut file).await?;

    assert_eq!(code, "console.log(1)");
    assert!(file.source_map.is_none());
    Ok(())
}

#[tokio::test]
async fn first_code_chunk_wins_over_assets() -> TestResult {
    let bundler = FakeBundler::new();
    bundler.set_outputs(
        "/p/a.js",
        vec![asset_chunk("style.css"), code_chunk("main"), code_chunk("chunk2")],
    );
    let (pre, _cache) = preprocessor(&bundler, BuildOptions::new(), None);

    let code = pre.preprocess("", &mut FileDescriptor::new("/p/a.js")).await?;

    assert_eq!(code, "main");
    Ok(())
}

#[tokio::test]
async fn inline_source_map_is_appended_as_data_url() -> TestResult {
    init_tracing();
    let bundler = FakeBundler::new();
    let map = sample_map("/p/a.js");
    bundler.set_outputs(
        "/p/a.js",
        vec![OutputChunk {
            map: Some(map.clone()),
            ..code_chunk("let a = 1;")
        }],
    );
    let (pre, _cache) = preprocessor(&bundler, inline_options(), None);

    let mut file = FileDescriptor::new("/p/a.js");
    let code = pre.preprocess("", &mut file).await?;

    let prefix = "let a = 1;\n//# sourceMappingURL=data:application/json;charset=utf-8;base64,";
    assert!(code.starts_with(prefix), "unexpected output: {code}");
    assert!(code.ends_with('\n'));

    let encoded = code[prefix.len()..].trim_end();
    let decoded: serde_json::Value = serde_json::from_slice(&STANDARD.decode(encoded)?)?;
    assert_eq!(decoded["sources"], json!(["/p/a.js"]));
    assert_eq!(decoded["version"], json!(3));
    assert_eq!(file.source_map, Some(map));
    Ok(())
}

#[tokio::test]
async fn external_source_map_is_attached_but_not_inlined() -> TestResult {
    let bundler = FakeBundler::new();
    bundler.set_outputs(
        "/p/a.js",
        vec![OutputChunk {
            map: Some(sample_map("/p/a.js")),
            ..code_chunk("let a = 1;")
        }],
    );
    let (pre, _cache) = preprocessor(&bundler, BuildOptions::new(), None);

    let mut file = FileDescriptor::new("/p/a.js");
    let code = pre.preprocess("", &mut file).await?;

    assert_eq!(code, "let a = 1;");
    assert!(file.source_map.is_some());
    Ok(())
}

#[tokio::test]
async fn build_failure_is_reported_and_leaves_watch_state_alone() -> TestResult {
    init_tracing();
    let bundler = FakeBundler::new();
    bundler.fail("/p/a.js", "Unexpected token (3:7)");
    let (tx, mut rx) = mpsc::channel(8);
    let (pre, cache) = preprocessor(&bundler, BuildOptions::new(), Some(tx));

    let err = pre
        .preprocess("", &mut FileDescriptor::new("/p/a.js"))
        .await
        .expect_err("build should fail");

    match err {
        DepwatchError::Build { entry, message } => {
            assert_eq!(entry, "a.js", "logged relative to the base path");
            assert!(message.contains("Unexpected token"), "{message}");
        }
        other => panic!("expected Build error, got {other:?}"),
    }
    assert!(rx.try_recv().is_err(), "failed builds report nothing");
    assert!(cache.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn output_path_follows_transform() -> TestResult {
    let bundler = FakeBundler::new();
    let (pre, _cache) = preprocessor(&bundler, BuildOptions::new(), None);
    let pre = pre.with_transform(PathTransform::new(|p: &Path| p.with_extension("out.js")));

    let mut file = FileDescriptor::new("/p/a.js");
    pre.preprocess("", &mut file).await?;

    assert_eq!(file.original_path, PathBuf::from("/p/a.js"));
    assert_eq!(file.path, PathBuf::from("/p/a.out.js"));
    Ok(())
}

#[tokio::test]
async fn single_run_preprocessor_reports_nothing() -> TestResult {
    let bundler = FakeBundler::new();
    bundler.set_dependencies("/p/a.js", &["/p/b.js"]);
    let (pre, _cache) = preprocessor(&bundler, BuildOptions::new(), None);

    pre.preprocess("", &mut FileDescriptor::new("/p/a.js")).await?;

    assert_eq!(bundler.builds().len(), 1);
    Ok(())
}

#[test]
fn build_error_without_a_cause_is_described_once() {
    let err = anyhow::anyhow!("SyntaxError: Unexpected token (3:7)");

    assert_eq!(describe_build_error(&err), "SyntaxError: Unexpected token (3:7)");
}

#[test]
fn build_error_with_a_cause_lists_the_chain() {
    let err = anyhow::anyhow!("Unexpected token (3:7)").context("bundler exited with status 1");

    let described = describe_build_error(&err);

    let (summary, chain) = described
        .split_once("\n\n")
        .expect("a cause chain follows the summary");
    assert_eq!(summary, "bundler exited with status 1: Unexpected token (3:7)");
    assert!(chain.contains("Caused by:"), "{chain}");
    assert!(chain.contains("Unexpected token (3:7)"), "{chain}");
}
