// src/config.rs
use crate::api::BatchPolicy;
use crate::constants::{INVENTORY_BATCH_DELAY, INVENTORY_BATCH_SIZE, REMOTE_CALL_TIMEOUT};
use crate::error::AppError;
use crate::types::{ApiKey, DataSourceId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the clippings that are not yet in Notion, grouped by book
    Compare {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Upload new clippings to Notion
    Sync {
        #[command(flatten)]
        target: TargetArgs,

        /// Upload only these positions of the compare listing (e.g. "0,3,4")
        #[arg(long, value_delimiter = ',')]
        select: Option<Vec<usize>>,

        /// Show what would be created and appended without writing anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// JSON export of clippings (array of {sourceTitle, sourceAuthor, capturedAt, content})
    pub input: PathBuf,

    /// Notion data source URL or ID (defaults to NOTION_DATABASE_ID)
    #[arg(long)]
    pub database: Option<String>,

    /// Number of pages whose content is read concurrently
    #[arg(long, default_value_t = INVENTORY_BATCH_SIZE)]
    pub batch_size: usize,

    /// Pause between content batches, in milliseconds
    #[arg(long, default_value_t = INVENTORY_BATCH_DELAY.as_millis() as u64)]
    pub batch_delay_ms: u64,

    /// Timeout for each Notion API call, in seconds
    #[arg(long, default_value_t = REMOTE_CALL_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

/// What a resolved invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    Compare,
    Sync,
    SyncSelected(Vec<usize>),
    DryRun,
}

/// Resolved sync configuration, validated before any remote call is made.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_key: ApiKey,
    pub data_source: DataSourceId,
    pub input: PathBuf,
    pub mode: SyncMode,
    pub batches: BatchPolicy,
    pub timeout: Duration,
}

impl SyncConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with(cli, |name| std::env::var(name).ok())
    }

    /// Resolves against an explicit environment lookup.
    pub fn resolve_with(
        cli: CommandLineInput,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let (target, mode) = match cli.command {
            Command::Compare { target } => (target, SyncMode::Compare),
            Command::Sync {
                target,
                dry_run: true,
                ..
            } => (target, SyncMode::DryRun),
            Command::Sync {
                target,
                select: Some(positions),
                ..
            } => (target, SyncMode::SyncSelected(positions)),
            Command::Sync { target, .. } => (target, SyncMode::Sync),
        };

        let api_key_str = present(env("NOTION_API_KEY")).ok_or_else(|| {
            AppError::ConfigurationMissing(
                "NOTION_API_KEY environment variable not set".to_string(),
            )
        })?;
        let api_key = ApiKey::new(api_key_str)?;

        let database = present(target.database)
            .or_else(|| present(env("NOTION_DATABASE_ID")))
            .ok_or_else(|| {
                AppError::ConfigurationMissing(
                    "no data source given: pass --database or set NOTION_DATABASE_ID".to_string(),
                )
            })?;
        let data_source = DataSourceId::parse(&database)?;

        Ok(SyncConfig {
            api_key,
            data_source,
            input: target.input,
            mode,
            batches: BatchPolicy::new(
                target.batch_size,
                Duration::from_millis(target.batch_delay_ms),
            ),
            timeout: Duration::from_secs(target.timeout_secs),
        })
    }
}

/// Blank values count as unset.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
