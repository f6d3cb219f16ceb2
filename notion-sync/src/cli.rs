//! # notion-sync CLI Interface (Module)
//!
//! Command parsing and orchestration for the `notion-sync` binary. All sync semantics live in
//! [`notion_sync_core`]; this module loads configuration, builds the Notion client and prints
//! the run summary.
//!
//! ## Commands
//! - `sync`: publish every configured document group to Notion. Exits non-zero when any file
//!   failed. `--json` prints the full per-file report instead of the text summary.
//! - `check`: resolve the configuration and list the files each group would publish, without
//!   contacting Notion.
//!
//! For programmatic/integration use, call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, DEFAULT_CONFIG_PATH};
use crate::notion::NotionClient;
use anyhow::Result;
use clap::{Parser, Subcommand};
use notion_sync_core::config::DocumentGroup;
use notion_sync_core::materialize::materialize;
use notion_sync_core::synchronise::{sync_all, SyncReport};
use std::path::{Path, PathBuf};

/// CLI for notion-sync: publish repository Markdown into Notion databases.
#[derive(Parser)]
#[clap(
    name = "notion-sync",
    version,
    about = "Publish groups of Markdown files from a repository into Notion databases"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise every configured document group to Notion
    Sync {
        /// Path to the YAML config file
        #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Repository root that file patterns are resolved against
        #[clap(long)]
        root: Option<PathBuf>,
        /// Print the full run report as JSON instead of the text summary
        #[clap(long)]
        json: bool,
    },
    /// Validate the config and list matched files without contacting Notion
    Check {
        /// Path to the YAML config file
        #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Repository root that file patterns are resolved against
        #[clap(long)]
        root: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, root, json } => {
            let config = load_config(config)?;
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            tracing::info!(command = "sync", root = ?root, "Starting synchronisation process");
            let client = NotionClient::new_from_env()?;

            let report = sync_all(&config, &root, &client).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            if report.is_success() {
                tracing::info!(command = "sync", summary = ?report.summary, "Synchronisation complete");
                Ok(())
            } else {
                tracing::error!(command = "sync", errors = report.summary.errors, "Synchronisation finished with errors");
                Err(anyhow::anyhow!(
                    "{} of {} files failed to sync",
                    report.summary.errors,
                    report.summary.total_files
                ))
            }
        }
        Commands::Check { config, root } => {
            let config = load_config(config)?;
            let root = root.unwrap_or_else(|| PathBuf::from("."));
            tracing::info!(command = "check", root = ?root, "Checking configuration");
            println!(
                "retry_attempts: {}, batch_size: {}",
                config.global.retry_attempts, config.global.batch_size
            );
            check(&config.groups, &root);
            Ok(())
        }
    }
}

fn check(groups: &[DocumentGroup], root: &Path) {
    let materialized = materialize(root, groups);
    for resolved in &materialized.groups {
        println!(
            "{} -> {} ({} files)",
            resolved.group.name,
            resolved.group.destination_id,
            resolved.files.len()
        );
        for file in &resolved.files {
            println!("  {file}");
        }
    }
    for name in &materialized.skipped {
        println!("{name}: no files matched, skipped");
    }
}

fn print_report(report: &SyncReport) {
    let summary = &report.summary;
    println!("Sync complete");
    println!("  Total files: {}", summary.total_files);
    println!("  Created:     {}", summary.created);
    println!("  Updated:     {}", summary.updated);
    println!("  Errors:      {}", summary.errors);
    if !report.skipped_groups.is_empty() {
        println!("  Skipped groups: {}", report.skipped_groups.join(", "));
    }
    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("Failures:");
        for outcome in failures {
            println!(
                "  [{}] {}: {}",
                outcome.group,
                outcome.file_path,
                outcome.error_detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
