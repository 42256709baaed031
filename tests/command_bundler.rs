// tests/command_bundler.rs

#![cfg(unix)]

mod common;
use crate::common::{TestResult, init_tracing};

use serde_json::json;
use tempfile::tempdir;

use depwatch::bundle::{BuildCache, BuildOptions, BuildRequest, Bundler, CommandBundler};

fn request(input: &str, cache: Option<BuildCache>) -> BuildRequest {
    let mut options = BuildOptions::new();
    options.insert("output".to_string(), json!({ "format": "iife" }));
    BuildRequest {
        input: input.to_string(),
        cache,
        options,
    }
}

#[tokio::test]
async fn reads_bundle_description_from_stdout() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let cmd = r#"cat > /dev/null; printf '%s' '{"cache":{"n":1},"watch_files":["{input}","/p/dep.js"],"outputs":[{"file_name":"a.js","code":"ok"}]}'"#;
    let bundler = CommandBundler::new(cmd, dir.path());

    let req = request("/p/a.js", None);
    let bundle = bundler.build(&req).await?;

    assert_eq!(bundle.watch_files, vec!["/p/a.js".to_string(), "/p/dep.js".to_string()]);
    assert_eq!(bundle.cache, Some(BuildCache(json!({ "n": 1 }))));

    let outputs = bundler.generate(&bundle, &req.options).await?;
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].code, "ok");
    assert!(!outputs[0].is_asset);
    Ok(())
}

#[tokio::test]
async fn options_arrive_on_stdin_with_input_and_cache() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let seen = dir.path().join("stdin.json");
    let cmd = format!(
        r#"cat > '{}'; printf '%s' '{{"watch_files":["'"$DEPWATCH_INPUT"'"]}}'"#,
        seen.display()
    );
    let bundler = CommandBundler::new(cmd, dir.path());

    let bundle = bundler
        .build(&request("/p/a.js", Some(BuildCache(json!({ "n": 1 })))))
        .await?;

    assert_eq!(bundle.watch_files, vec!["/p/a.js".to_string()]);
    assert!(bundle.cache.is_none());

    let payload: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&seen)?)?;
    assert_eq!(payload["options"]["input"], json!("/p/a.js"));
    assert_eq!(payload["options"]["cache"], json!({ "n": 1 }));
    assert_eq!(payload["options"]["output"]["format"], json!("iife"));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_fails_with_stderr() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let bundler = CommandBundler::new("echo 'Unexpected token' >&2; exit 3", dir.path());

    let err = bundler
        .build(&request("/p/a.js", None))
        .await
        .expect_err("bundler should fail");

    let message = format!("{err:#}");
    assert!(message.contains("status 3"), "{message}");
    assert!(message.contains("Unexpected token"), "{message}");
    Ok(())
}
