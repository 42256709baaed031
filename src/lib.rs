// src/lib.rs

pub mod bundle;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod graph;
pub mod host;
pub mod logging;
pub mod session;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::bundle::{Bundler, CommandBundler, PathTransform};
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::fs::{FileSystem, RealFileSystem};
use crate::host::{BundleWriter, ResolvedEntry, resolve_entries};
use crate::session::Session;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - entry resolution
/// - the bundler and one preprocessor per profile
/// - (watch mode) the watch runtime and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    if args.single_run || args.no_watch {
        cfg.set_single_run();
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let base_path = fs.canonicalize(&base_dir(&cfg, &config_path))?;
    let entries = resolve_entries(fs.as_ref(), &base_path, cfg.entries())?;

    if args.dry_run {
        print_dry_run(&cfg, &base_path, &entries);
        return Ok(());
    }

    if entries.is_empty() {
        bail!("no entry files matched under {}", base_path.display());
    }

    let session = Session::with_notify(cfg.run_mode())?;
    let bundler: Arc<dyn Bundler> =
        Arc::new(CommandBundler::new(cfg.bundler().cmd.clone(), &base_path));

    let mut writer = BundleWriter::new(Arc::clone(&fs));
    for entry in &entries {
        let (options, transform) = cfg.profile_settings(entry.profile.as_deref());
        let preprocessor = session.preprocessor(
            Arc::clone(&bundler),
            options,
            PathTransform::from_config(transform, &base_path),
            &base_path,
        );
        writer.add_entry(&entry.path, preprocessor);
    }
    let writer = Arc::new(writer);

    let shutdown_tx = session.event_sender();
    let runtime = session.into_runtime(
        cfg.log_watch(),
        &base_path,
        Arc::clone(&writer),
        RuntimeOptions {
            batch_delay: cfg.batch_delay(),
        },
    );

    let (Some(runtime), Some(shutdown_tx)) = (runtime, shutdown_tx) else {
        let failed = bundle_all(&writer, &entries).await;
        if failed > 0 {
            bail!("{failed} of {} entries failed to bundle", entries.len());
        }
        return Ok(());
    };

    // Ctrl-C → graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(RuntimeEvent::ShutdownRequested).await;
    });

    // Initial builds report their dependencies into the runtime, which must
    // already be draining the channel.
    {
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            let failed = bundle_all(&writer, &entries).await;
            info!(
                total = entries.len(),
                failed, "initial bundling finished; watching for changes"
            );
        });
    }

    runtime.run().await?;
    Ok(())
}

/// Bundle every entry once. Returns how many failed.
async fn bundle_all(writer: &BundleWriter, entries: &[ResolvedEntry]) -> usize {
    let mut failed = 0;
    for entry in entries {
        if let Err(err) = writer.write_entry(&entry.path).await {
            warn!(entry = %entry.path, error = %err, "entry failed to bundle");
            failed += 1;
        }
    }
    failed
}

/// Directory entry patterns are resolved against.
///
/// `[config].base_path` is taken relative to the config file's directory; a
/// bare config filename means the current working directory.
fn base_dir(cfg: &ConfigFile, config_path: &Path) -> PathBuf {
    let config_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    match &cfg.section().base_path {
        Some(base) => config_dir.join(base),
        None => config_dir,
    }
}

/// Simple dry-run output: print settings and resolved entries.
fn print_dry_run(cfg: &ConfigFile, base_path: &Path, entries: &[ResolvedEntry]) {
    println!("depwatch dry-run");
    println!("  base_path = {}", base_path.display());
    println!("  mode = {:?}", cfg.run_mode());
    println!("  log_watch = {}", cfg.log_watch());
    println!(
        "  auto_watch_batch_delay = {}ms",
        cfg.section().auto_watch_batch_delay
    );
    println!("  bundler.cmd = {}", cfg.bundler().cmd);
    println!();

    println!("entries ({}):", entries.len());
    for entry in entries {
        let rel = watch::path_utils::display_relative(base_path, &entry.path);
        match &entry.profile {
            Some(profile) => println!("  - {rel} (profile: {profile})"),
            None => println!("  - {rel}"),
        }
    }
}
