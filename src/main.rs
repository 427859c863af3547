mod cli;

use crate::cli::{Cli, Command};
use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use reel_config::Config;
use reel_index::{Database, IndexHandle};
use reel_library::ingest::plan_upload;
use reel_library::reconcile::{CleanupOptions, Reconciler, backup_dir_name, generate_report};
use reel_storage::BackendHandle;
use reel_storage::backend::LocalBackend;
use reel_transcode::{BinaryLocator, health_check};
use serde::Serialize;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use time::UtcDateTime;
use tracing_subscriber::EnvFilter;

/// Render an error tree, locations included, as a diagnostic.
fn diagnostic(err: impl Debug) -> miette::Report {
    miette!("{err:?}")
}

fn init_tracing(verbose: bool) {
    let default = match verbose {
        true => "debug",
        false => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load(cli.config.as_deref()).map_err(diagnostic).wrap_err("Failed to load configuration")?;

    match cli.command {
        Command::Detect { redetect } => detect(&config, redetect).await,
        Command::Health => {
            let locator = BinaryLocator::new(config.transcoder.clone());
            print_json(&health_check(&locator).await)
        },
        Command::Policy { size, mime, transparent, animated } => {
            print_json(&plan_upload(size, &mime, transparent, animated, &config.policy))
        },
        Command::Orphans { dry_run, no_backup } => {
            orphans(&config, CleanupOptions { backup: !no_backup, dry_run }).await
        },
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

async fn detect(config: &Config, redetect: bool) -> Result<()> {
    tracing::debug!(redetect, "Detecting transcoder binaries");
    let locator = BinaryLocator::new(config.transcoder.clone());
    if redetect {
        locator.redetect();
    }
    let configured = locator.validate();
    let paths = locator.paths();
    let (ffmpeg_runs, ffprobe_runs) = tokio::join!(locator.test_primary(), locator.test_probe());
    for (tool, path, runs) in [("ffmpeg", &paths.ffmpeg, ffmpeg_runs), ("ffprobe", &paths.ffprobe, ffprobe_runs)] {
        let path = path.as_deref().map_or_else(|| "(not detected)".to_string(), |p| p.display().to_string());
        let status = match runs {
            true => "ok",
            false => "not responding",
        };
        println!("{tool:<8} {path} [{status}]");
    }
    if !configured {
        return Err(miette!("Transcoder configuration failed"));
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<std::path::PathBuf> {
    std::path::absolute(path).into_diagnostic().wrap_err_with(|| format!("Invalid path {}", path.display()))
}

async fn orphans(config: &Config, options: CleanupOptions) -> Result<()> {
    let media: BackendHandle =
        Arc::new(LocalBackend::new("media", absolute(&config.media.directory)?).map_err(diagnostic)?);

    let db_path = absolute(&config.database.path)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = Database::connect(&db_path).await.map_err(diagnostic).wrap_err("Failed to open media index")?;
    let index: IndexHandle = Arc::new(db.repository());

    let mut reconciler = Reconciler::new(media, index);
    if options.backup {
        let root = absolute(&config.media.backup_directory)?.join(backup_dir_name(UtcDateTime::now()));
        let backups: BackendHandle = Arc::new(LocalBackend::new("backups", root).map_err(diagnostic)?);
        reconciler = reconciler.with_backups(backups);
    }

    let result = reconciler.cleanup_orphan_files(options).await;
    db.close().await;
    let report = result.map_err(diagnostic).wrap_err("Orphan cleanup aborted")?;
    print!("{}", generate_report(&report));
    Ok(())
}
