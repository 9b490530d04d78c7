//! SmartShare CLI: compress media and publish it into shared storage.
//!
//! Configuration comes from `SMARTSHARE_*` environment variables (and `.env`); flags
//! override them.

use anyhow::Context;
use clap::{Parser, Subcommand};
use smartshare_cli::{
    comparison_line, format_kb, init_tracing, truncate_string, CommandShareSink,
    ManifestShareSink,
};
use smartshare_core::{ErrorMetadata, MediaReference, PublishConfig, Quality, StorageBackend};
use smartshare_processing::{BatchOptions, BatchPublisher, ShareSink};
use smartshare_storage::{create_storage, detect_backend, ListScope};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "smartshare", about = "Compress media and publish it for other apps")]
struct Cli {
    /// Shared storage root
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Storage backend: pending, staging or auto
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress and publish files, then hand them to a share target
    Publish {
        /// Files to publish (paths or file:// URIs)
        references: Vec<String>,
        /// Subfolder inside Pictures/ and Movies/
        #[arg(long)]
        subfolder: Option<String>,
        /// Compression quality, clamped to 0-100
        #[arg(long, allow_negative_numbers = true)]
        quality: Option<i64>,
        /// Maximum number of items processed at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Per-item transfer timeout in seconds (0 disables)
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Program to launch with the published paths instead of printing a manifest
        #[arg(long)]
        share_command: Option<String>,
        /// Application id passed along with the share hint
        #[arg(long)]
        share_target: Option<String>,
        /// Publish only, skip the share hand-off
        #[arg(long)]
        no_share: bool,
    },
    /// List entries in shared storage
    List {
        /// Include pending and staged entries
        #[arg(long)]
        all: bool,
        /// Only entries in this subfolder
        #[arg(long)]
        subfolder: Option<String>,
    },
    /// Show which backend the storage root supports
    Detect,
}

fn apply_storage_flags(
    config: &mut PublishConfig,
    root: Option<PathBuf>,
    backend: Option<String>,
) -> anyhow::Result<()> {
    if let Some(root) = root {
        config.storage_root = root;
    }
    if let Some(backend) = backend {
        config.storage_backend = match backend.trim() {
            "auto" => None,
            other => Some(
                other
                    .parse::<StorageBackend>()
                    .context("Invalid --backend")?,
            ),
        };
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = PublishConfig::from_env().context("Failed to load configuration")?;
    apply_storage_flags(&mut config, cli.root, cli.backend)?;

    match cli.command {
        Commands::Publish {
            references,
            subfolder,
            quality,
            concurrency,
            timeout_secs,
            share_command,
            share_target,
            no_share,
        } => {
            if let Some(subfolder) = subfolder {
                config.subfolder = subfolder;
            }
            if let Some(quality) = quality {
                config.quality = Quality::clamped(quality);
            }
            if let Some(concurrency) = concurrency {
                config.max_concurrency = concurrency;
            }
            if let Some(secs) = timeout_secs {
                config.transfer_timeout = Some(Duration::from_secs(secs)).filter(|d| !d.is_zero());
            }
            if share_target.is_some() {
                config.share_target = share_target;
            }
            config.validate().context("Invalid configuration")?;

            let storage = create_storage(&config)
                .await
                .context("Failed to open shared storage")?;
            let batch = BatchPublisher::from_config(&config, storage);
            let options = BatchOptions::from_config(&config);
            let references: Vec<MediaReference> =
                references.into_iter().map(MediaReference::from).collect();

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, finishing items already publishing");
                    on_signal.cancel();
                }
            });

            let report = if no_share {
                batch
                    .publish_all_detailed(&references, &options, &cancel)
                    .await?
            } else {
                let sink: Box<dyn ShareSink> = match share_command.as_deref() {
                    Some(command_line) => Box::new(
                        CommandShareSink::parse(command_line)
                            .context("--share-command must name a program")?,
                    ),
                    None => Box::new(ManifestShareSink),
                };
                batch
                    .publish_and_share(&references, &options, sink.as_ref(), &cancel)
                    .await?
            };

            for pair in report.comparisons() {
                eprintln!("{}", comparison_line(&pair));
            }
            for (reference, error) in report.failures() {
                eprintln!("failed: {} [{}] {}", reference, error.error_code(), error);
            }

            if !report.is_empty() && report.published().count() == 0 {
                anyhow::bail!("No item was published");
            }
        }
        Commands::List { all, subfolder } => {
            let storage = create_storage(&config)
                .await
                .context("Failed to open shared storage")?;
            let scope = if all { ListScope::All } else { ListScope::Visible };
            let entries = storage.list_entries(scope).await?;

            for entry in entries {
                let in_subfolder = subfolder.as_deref().map_or(true, |wanted| {
                    entry.relative_path.split('/').nth(1) == Some(wanted)
                });
                if !in_subfolder {
                    continue;
                }
                println!(
                    "{:<60} {:>10}{}",
                    truncate_string(&entry.relative_path, 60),
                    format_kb(entry.size_bytes),
                    if entry.pending { "  (pending)" } else { "" }
                );
            }
        }
        Commands::Detect => {
            let backend = detect_backend(&config.storage_root)
                .await
                .context("Failed to probe storage root")?;
            println!("{} ({})", backend, config.storage_root.display());
        }
    }

    Ok(())
}
