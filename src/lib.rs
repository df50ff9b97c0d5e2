// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod namer;
pub mod path_utils;
pub mod processor;
pub mod types;
pub mod watch;

pub use engine::{CompileRequest, Pipeline};
pub use processor::{ProcessorSpec, Transformed};
pub use types::{CompileOutput, Manifest, WatchEvent, WatchEventKind};

use std::path::{Path, PathBuf};

use anyhow::Result;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::env;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::patterns::build_compile_request;
use crate::fs::FileSystem;
use crate::path_utils::parent_dir;
use crate::watch::{ErrorHook, WatchOptions, WatchSource};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and environment overrides
/// - the on-disk pipeline
/// - one-shot compile or watch session
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let request = build_compile_request(&cfg, args.entry.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg, &request);
        return Ok(());
    }

    let pipeline = Pipeline::on_disk();
    let manifest_path = cfg.manifest_path();

    if !args.watch {
        let output = pipeline.compile(&request).await?;
        emit(pipeline.fs().as_ref(), &output, manifest_path.as_deref()).await?;
        return Ok(());
    }

    let poll = env::resolve_poll(
        args.poll,
        cfg.config().poll,
        env::poll_from_env(env::process_env),
    );
    let strict = env::resolve_strict(
        args.strict,
        cfg.config().strict_errors,
        env::strict_from_env(env::process_env),
    );
    info!(?poll, strict, entry = ?request.entry, "starting watch");

    // Ctrl-C → cancel the session; the stream then ends on its own.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let options = WatchOptions::new(cancel)
        .source(WatchSource::from_poll_interval(poll))
        .on_error(ErrorHook::from_strictness(strict));

    let mut snapshots = pipeline.watch(request, options);
    while let Some(snapshot) = snapshots.next().await {
        let output = snapshot?;
        emit(pipeline.fs().as_ref(), &output, manifest_path.as_deref()).await?;
    }

    info!("watch finished");
    Ok(())
}

/// Print the manifest JSON to stdout and, when configured, write it to disk.
async fn emit(fs: &dyn FileSystem, output: &CompileOutput, manifest_path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(output)?;
    println!("{json}");

    if let Some(path) = manifest_path {
        let dir = parent_dir(path);
        if !dir.as_os_str().is_empty() {
            fs.create_dir_all(&dir).await?;
        }
        fs.write(path, json.as_bytes()).await?;
        debug!(?path, "manifest written");
    }
    Ok(())
}

/// Simple dry-run output: entry, processors and global settings.
fn print_dry_run(cfg: &ConfigFile, request: &CompileRequest) {
    println!("assetpipe dry-run");
    println!("  entry = {:?}", request.entry);
    if let Some(poll) = cfg.config().poll {
        println!("  config.poll = {poll:?}");
    }
    if let Some(strict) = cfg.config().strict_errors {
        println!("  config.strict_errors = {strict}");
    }
    if let Some(manifest) = cfg.manifest_path() {
        println!("  config.manifest = {manifest:?}");
    }
    println!();

    println!("processors ({}):", cfg.processors().len());
    for (index, (processor, spec)) in cfg.processors().iter().zip(&request.processors).enumerate() {
        println!("  - #{index} -> {:?}", spec.out_root());
        if !processor.recursive {
            println!("      recursive: false");
        }
        if !processor.include.is_empty() {
            println!("      include: {:?}", processor.include);
        }
        if !processor.exclude.is_empty() {
            println!("      exclude: {:?}", processor.exclude);
        }
        println!("      rename: {:?}", processor.rename);
        if processor.rename == types::RenameMode::ContentHash {
            println!("      hash_length: {}", processor.hash_length);
        }
    }

    debug!("dry-run complete (nothing compiled)");
}
