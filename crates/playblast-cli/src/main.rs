//! Playblast ledger CLI
//!
//! The `playblast` command allocates versioned preview slots, runs full
//! playblasts through a configured renderer, and publishes previews.
//!
//! ## Commands
//!
//! - `preview`: Allocate a preview slot and print its artifact template
//! - `run`: Allocate, render, and run the configured auxiliary steps
//! - `versions`: List version directories
//! - `history`: Show the preview and publish ledgers
//! - `publish`: Publish one or more preview versions
//! - `show`: Open a version in the configured viewer

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

use playblast_core::{
    list_versions, run_command, FrameRange, HostRenderer, PathResolver, PlayblastConfig,
    PreviewManager, PreviewRequest, PublishManager, PublishOutcome, VersionKind, VersionMode,
};

#[derive(Parser)]
#[command(name = "playblast")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Versioned preview renders and publishes", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true, env = "PLAYBLAST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and results
    #[arg(long, global = true)]
    json: bool,

    /// Host document being previewed (overrides the config file)
    #[arg(long, global = true, env = "PLAYBLAST_DOCUMENT")]
    document: Option<PathBuf>,

    /// Department or work category, e.g. "fx"
    #[arg(long, global = true, env = "PLAYBLAST_CLASSIFICATION")]
    classification: Option<String>,

    /// User the versions belong to (default: login name)
    #[arg(long, global = true, env = "PLAYBLAST_USER")]
    user: Option<String>,

    /// Base directory for the preview tree
    #[arg(long, global = true, env = "PLAYBLAST_PREVIEW_BASE")]
    preview_base: Option<PathBuf>,

    /// Base directory for the publish tree
    #[arg(long, global = true, env = "PLAYBLAST_PUBLISH_BASE")]
    publish_base: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a preview slot and print where to render
    Preview {
        /// Free-form note stored in the ledger
        #[arg(short, long, default_value = "")]
        note: String,

        /// Re-render into the latest version instead of a new one
        #[arg(long)]
        reuse: bool,
    },

    /// Allocate a slot and render into it
    Run {
        /// First frame
        #[arg(long)]
        start: i64,

        /// Last frame (inclusive)
        #[arg(long)]
        end: i64,

        /// Free-form note stored in the ledger
        #[arg(short, long, default_value = "")]
        note: String,

        /// Re-render into the latest version instead of a new one
        #[arg(long)]
        reuse: bool,
    },

    /// List version directories
    Versions {
        /// List publish versions instead of previews
        #[arg(long)]
        publish: bool,
    },

    /// Show preview and publish history
    History,

    /// Publish preview versions (ascending order, duplicates kept)
    Publish {
        /// Preview version numbers
        #[arg(required = true)]
        versions: Vec<u32>,
    },

    /// Publish the most recent preview
    PublishLatest,

    /// Print the recorded artifact path of a publish
    PublishedPath {
        /// Publish version number
        version: u32,
    },

    /// Open a version in the configured viewer
    Show {
        /// Version number
        version: u32,

        /// Treat the number as a publish version
        #[arg(long)]
        published: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    playblast_core::init_tracing(cli.json, level);

    let config = resolve_config(&cli)?;
    let json = cli.json;

    match cli.command {
        Commands::Preview { note, reuse } => cmd_preview(config, &note, reuse, json),
        Commands::Run {
            start,
            end,
            note,
            reuse,
        } => cmd_run(config, start, end, &note, reuse, json).await,
        Commands::Versions { publish } => cmd_versions(&config, publish),
        Commands::History => cmd_history(config, json),
        Commands::Publish { versions } => cmd_publish(config, &versions, json),
        Commands::PublishLatest => cmd_publish_latest(config, json),
        Commands::PublishedPath { version } => cmd_published_path(config, version),
        Commands::Show { version, published } => cmd_show(config, version, published).await,
    }
}

/// Config file (if any) with command-line overrides applied on top.
fn resolve_config(cli: &Cli) -> Result<PlayblastConfig> {
    let mut config = match &cli.config {
        Some(path) => PlayblastConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let document = cli
                .document
                .clone()
                .context("--document is required when no config file is given")?;
            let classification = cli
                .classification
                .clone()
                .context("--classification is required when no config file is given")?;
            PlayblastConfig::new(document, classification)
        }
    };

    if let Some(document) = &cli.document {
        config.document = document.clone();
    }
    if let Some(classification) = &cli.classification {
        config.classification = classification.clone();
    }
    if let Some(user) = &cli.user {
        config.user = user.clone();
    }
    if cli.preview_base.is_some() {
        config.preview_base = cli.preview_base.clone();
    }
    if cli.publish_base.is_some() {
        config.publish_base = cli.publish_base.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn request_for(config: &PlayblastConfig, note: &str, reuse: bool) -> PreviewRequest {
    let request = PreviewRequest::from_config(config, note);
    if reuse {
        request.with_mode(VersionMode::ReuseLatest)
    } else {
        request
    }
}

/// Allocate a preview slot; the host renders into it.
fn cmd_preview(config: PlayblastConfig, note: &str, reuse: bool, json: bool) -> Result<()> {
    let request = request_for(&config, note, reuse);
    let manager = PreviewManager::new(config, Arc::new(HostRenderer))?;
    let slot = manager
        .create_preview(&request)
        .context("Failed to allocate preview")?;

    if json {
        return print_json(&slot);
    }
    let verb = if slot.created { "Created" } else { "Reusing" };
    println!("{verb} {} in {}", slot.tag, slot.directory.display());
    println!("{}", slot.artifact_template);
    Ok(())
}

/// Full playblast through the configured `[render]` command.
async fn cmd_run(
    config: PlayblastConfig,
    start: i64,
    end: i64,
    note: &str,
    reuse: bool,
    json: bool,
) -> Result<()> {
    let frames = FrameRange::new(start, end)?;
    let request = request_for(&config, note, reuse);
    let manager = PreviewManager::from_config(config)?;

    let report = manager
        .playblast(&request, frames)
        .await
        .context("Playblast failed")?;

    if json {
        return print_json(&report);
    }
    println!("Rendered {} ({}-{})", report.slot.tag, start, end);
    println!("  Frames: {}", report.slot.artifact_template);
    if let Some(movie) = &report.movie {
        println!("  Movie:  {}", movie.display());
    }
    if report.notified {
        println!("  Notification sent");
    }
    for warning in &report.warnings {
        println!("  Warning ({}): {}", warning.step, warning.message);
    }
    Ok(())
}

fn cmd_versions(config: &PlayblastConfig, publish: bool) -> Result<()> {
    let resolver = PathResolver::new(config)?;
    let (root, kind) = if publish {
        (resolver.publish_root()?, VersionKind::Publish)
    } else {
        (
            resolver.preview_root(&config.classification, &config.user),
            VersionKind::Preview,
        )
    };

    let tags = list_versions(&root, kind)?;
    if tags.is_empty() {
        println!("No versions under {}", root.display());
        return Ok(());
    }
    for tag in tags {
        println!("{tag}");
    }
    Ok(())
}

#[derive(Serialize)]
struct HistoryOutput {
    previews: Vec<playblast_core::PreviewRecord>,
    publishes: Vec<playblast_core::PublishRecord>,
}

fn cmd_history(config: PlayblastConfig, json: bool) -> Result<()> {
    let (classification, user) = (config.classification.clone(), config.user.clone());
    let publisher = PublishManager::new(config.clone())?;
    let previews = PreviewManager::new(config, Arc::new(HostRenderer))?
        .history(&classification, &user)
        .context("Failed to read preview ledger")?;
    let publishes = publisher
        .history()
        .context("Failed to read publish ledger")?;

    if json {
        return print_json(&HistoryOutput {
            previews,
            publishes,
        });
    }

    println!(
        "Previews ({classification}/{user}): {} version(s)",
        previews.len()
    );
    if previews.is_empty() {
        println!("  (none)");
    }
    for record in &previews {
        println!("  {}  {}", record.version_tag, record.note);
    }
    println!("Publishes: {} version(s)", publishes.len());
    if publishes.is_empty() {
        println!("  (none)");
    }
    for record in &publishes {
        println!("  {}  {}", record.publish_tag, record.summary());
    }
    Ok(())
}

fn print_outcome(outcome: &PublishOutcome) {
    println!(
        "Published {} as {} ({} files)",
        outcome.record.source_version_tag, outcome.publish_tag, outcome.copied
    );
    for warning in &outcome.warnings {
        println!("  Skipped {}: {}", warning.file.display(), warning.message);
    }
}

fn cmd_publish(config: PlayblastConfig, versions: &[u32], json: bool) -> Result<()> {
    let manager = PublishManager::new(config)?;
    let report = manager.publish_many(versions);

    if json {
        let outcomes: Vec<&PublishOutcome> = report.succeeded().collect();
        print_json(&outcomes)?;
    } else {
        for outcome in report.succeeded() {
            print_outcome(outcome);
        }
    }
    for (version, err) in report.failed() {
        eprintln!("p{version:03}: {err}");
    }

    let failed = report.failed().count();
    if failed > 0 {
        bail!("{failed} of {} publishes failed", report.items.len());
    }
    Ok(())
}

fn cmd_publish_latest(config: PlayblastConfig, json: bool) -> Result<()> {
    let outcome = PublishManager::new(config)?
        .publish_latest()
        .context("Failed to publish latest preview")?;
    if json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

fn cmd_published_path(config: PlayblastConfig, version: u32) -> Result<()> {
    let path = PublishManager::new(config)?.resolve_published_artifact_path(version)?;
    println!("{}", path.display());
    Ok(())
}

/// Artifact path recorded for a preview or publish version.
fn artifact_for(config: PlayblastConfig, version: u32, published: bool) -> Result<String> {
    if published {
        let path = PublishManager::new(config)?
            .resolve_published_artifact_path(version)
            .with_context(|| format!("No publish found for v{version:03}"))?;
        return Ok(path.to_string_lossy().into_owned());
    }
    let (classification, user) = (config.classification.clone(), config.user.clone());
    let artifact = PreviewManager::new(config, Arc::new(HostRenderer))?
        .artifact_path(&classification, &user, version)
        .with_context(|| format!("No preview found for p{version:03}"))?;
    Ok(artifact)
}

async fn cmd_show(config: PlayblastConfig, version: u32, published: bool) -> Result<()> {
    let viewer = config.viewer;
    let artifact = artifact_for(config, version, published)?;
    let spec = viewer.command(&artifact);
    info!(program = %spec.program, artifact = %artifact, "opening viewer");
    run_command(&spec)
        .await
        .with_context(|| format!("Failed to launch {}", spec.program))?;
    Ok(())
}
