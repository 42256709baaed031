// src/bundle/command.rs

//! Bundler backed by an external process.
//!
//! Protocol:
//! - the command line is run through the platform shell with `{input}`
//!   replaced by the entry path (also exported as `DEPWATCH_INPUT`);
//! - stdin receives `{"options": {...}}`, the merged options with `input`
//!   and the previous `cache` injected;
//! - stdout must be a single JSON document
//!   `{"cache": ..., "watch_files": [...], "outputs": [...]}`;
//! - a non-zero exit status fails the build, with stderr as the message.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::bundle::{
    BuildCache, BuildOptions, BuildRequest, Bundle, Bundler, BundlerFuture, OutputChunk,
};

#[derive(Debug, Deserialize)]
struct CommandOutput {
    #[serde(default)]
    cache: Option<Value>,
    #[serde(default)]
    watch_files: Vec<String>,
    #[serde(default)]
    outputs: Vec<OutputChunk>,
}

#[derive(Debug, Clone)]
pub struct CommandBundler {
    cmd: String,
    cwd: PathBuf,
}

impl CommandBundler {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }

    fn command_for(&self, input: &str) -> Command {
        let line = self.cmd.replace("{input}", input);

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };

        cmd.current_dir(&self.cwd)
            .env("DEPWATCH_INPUT", input)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, request: &BuildRequest) -> anyhow::Result<Bundle> {
        let payload = serde_json::to_vec(&json!({ "options": request.options_with_inputs() }))
            .context("serializing bundler options")?;

        let mut child = self
            .command_for(&request.input)
            .spawn()
            .with_context(|| format!("spawning bundler for '{}'", request.input))?;

        let mut stdin = child.stdin.take().context("bundler stdin unavailable")?;
        let write = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output =
            output.with_context(|| format!("waiting for bundler of '{}'", request.input))?;

        if let Err(err) = written {
            // The bundler may legitimately ignore stdin.
            debug!(input = %request.input, error = %err, "bundler did not read options");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "bundler exited with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        let parsed: CommandOutput = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing bundler output for '{}'", request.input))?;

        debug!(
            input = %request.input,
            watch_files = parsed.watch_files.len(),
            outputs = parsed.outputs.len(),
            "bundler finished"
        );

        Ok(Bundle {
            cache: parsed.cache.filter(|c| !c.is_null()).map(BuildCache),
            watch_files: parsed.watch_files,
            artifact: serde_json::to_value(parsed.outputs).context("storing bundler outputs")?,
        })
    }
}

impl Bundler for CommandBundler {
    fn build<'a>(&'a self, request: &'a BuildRequest) -> BundlerFuture<'a, Bundle> {
        Box::pin(self.run(request))
    }

    fn generate<'a>(
        &'a self,
        bundle: &'a Bundle,
        _options: &'a BuildOptions,
    ) -> BundlerFuture<'a, Vec<OutputChunk>> {
        Box::pin(async move {
            serde_json::from_value(bundle.artifact.clone()).context("reading bundler outputs")
        })
    }
}
