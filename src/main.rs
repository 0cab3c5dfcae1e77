// src/main.rs

use clap::Parser;
use clipsync::{
    load_clippings, AppError, CommandLineInput, CompareReport, EntityOutcome, LogLevel,
    NotionHttpClient, SyncConfig, SyncEngine, SyncMode, SyncPlan, SyncSession, WriteStatus,
};
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("clipsync.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Loads the export, builds the engine and runs the requested mode.
async fn execute(config: &SyncConfig) -> Result<(), AppError> {
    let clippings = load_clippings(&config.input)?;
    println!(
        "📚 Loaded {} clippings from {}",
        clippings.len(),
        config.input.display()
    );

    let client = NotionHttpClient::new(&config.api_key, config.timeout)?;
    let engine = SyncEngine::new(Arc::new(client), config.data_source.clone())
        .with_batches(config.batches)
        .with_sink(Arc::new(console_sink));
    let mut session = SyncSession::new();

    match &config.mode {
        SyncMode::Compare => {
            let report = engine.compare(&mut session, &clippings).await?;
            print_compare(&report);
        }
        SyncMode::DryRun => {
            let plan = engine.plan(&mut session, &clippings).await?;
            print_plan(&plan);
        }
        SyncMode::Sync => {
            let outcome = engine.run(&mut session, &clippings).await?;
            print_outcomes(&outcome.outcomes);
        }
        SyncMode::SyncSelected(positions) => {
            let report = engine.compare(&mut session, &clippings).await?;
            let selected = report.select(positions)?;
            let outcomes = engine.sync_selected(&mut session, &selected).await?;
            print_outcomes(&outcomes);
        }
    }

    Ok(())
}

/// Prints progress lines for the user and keeps them in the log file.
fn console_sink(level: LogLevel, message: &str) {
    log::debug!(target: "clipsync::progress", "{}", message);
    match level {
        LogLevel::Info => println!("{}", message),
        LogLevel::Warn => eprintln!("⚠️  {}", message),
        LogLevel::Error => eprintln!("❌ {}", message),
    }
}

fn print_compare(report: &CompareReport) {
    if report.unsynced.is_empty() {
        println!("✓ Everything is already in Notion ({} hidden).", report.hidden);
        return;
    }

    // Positions index the flat unsynced list; that is what `sync --select` takes.
    for group in report.groups() {
        println!("\n{} by {}", group.title, group.author);
        for member in &group.clippings {
            let Some(at) = report
                .unsynced
                .iter()
                .position(|c| c.original_index == member.original_index)
            else {
                continue;
            };
            println!(
                "  [{}] {} {}",
                at,
                member.clipping.captured_at.format("%Y-%m-%d"),
                preview(&member.clipping.content)
            );
        }
    }
    println!(
        "\n{} new clippings, {} already in Notion.",
        report.unsynced.len(),
        report.hidden
    );
}

fn print_plan(plan: &SyncPlan) {
    let result = &plan.reconciliation;
    for group in &result.to_create {
        println!("+ create \"{}\" ({} clippings)", group.title, group.len());
    }
    for append in &result.to_append {
        println!(
            "~ append to \"{}\" ({} clippings)",
            append.group.title,
            append.group.len()
        );
    }
    for group in &plan.withheld {
        println!("! hold back \"{}\" (content unreadable)", group.title);
    }
    println!(
        "Dry run: {} clippings would be uploaded, {} already synced.",
        result.pending_clippings(),
        result.already_synced
    );
}

fn print_outcomes(outcomes: &[EntityOutcome]) {
    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    let written: usize = outcomes
        .iter()
        .map(|o| match o.status {
            WriteStatus::Written { blocks, .. } => blocks,
            _ => 0,
        })
        .sum();

    if failed == 0 {
        println!("✓ Uploaded {} clippings.", written);
    } else {
        eprintln!(
            "⚠️  Uploaded {} clippings; {} items failed (see log above).",
            written, failed
        );
    }
}

fn preview(content: &str) -> String {
    const LIMIT: usize = 80;
    let flat = content.replace('\n', " ");
    if flat.chars().count() <= LIMIT {
        flat
    } else {
        format!("{}…", flat.chars().take(LIMIT).collect::<String>())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = SyncConfig::resolve(cli)?;

    execute(&config).await?;

    Ok(())
}
