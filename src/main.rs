//! Ticket-Sync main entry point
//!
//! This is the command-line interface for the Ticket-Sync incremental indexer.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use ticket_sync::config::{load_config_with_hash, Config};
use ticket_sync::connector::Collaborators;
use ticket_sync::session::{handle, read_watermark, InvocationResponse, SyncEvent};
use ticket_sync::storage::{FileSecretStore, SqliteStorage};
use ticket_sync::transport::ReqwestTransport;
use tracing_subscriber::EnvFilter;

/// Ticket-Sync: a resumable, time-boxed incremental indexer
///
/// Each invocation crawls changed tickets until the source is exhausted or
/// the time budget runs out, then hands the page cursor to the next
/// invocation through a continuation event.
#[derive(Parser, Debug)]
#[command(name = "ticket-sync")]
#[command(version)]
#[command(about = "Resumable incremental ticket indexer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one bounded invocation for a trigger event
    Invoke {
        /// Event JSON file, or `-` for stdin
        #[arg(long, value_name = "FILE")]
        event: String,
    },

    /// Run a whole pass locally, delivering continuation events in order
    Run {
        #[arg(long)]
        index_id: String,

        #[arg(long)]
        data_source_name: String,

        #[arg(long)]
        data_source_id: String,
    },

    /// Print the stored watermark
    Watermark,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Invoke { event } => handle_invoke(&config, &event).await,
        Command::Run {
            index_id,
            data_source_name,
            data_source_id,
        } => {
            let trigger = SyncEvent {
                index_id,
                data_source_name,
                data_source_id,
                next_page_token: None,
                job_execution_id: None,
            };
            handle_run(&config, trigger).await
        }
        Command::Watermark => handle_watermark(&config).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` overrides the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "ticket_sync=info,warn",
            1 => "ticket_sync=debug,info",
            2 => "ticket_sync=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the local collaborator backends
fn open_collaborators(config: &Config) -> anyhow::Result<(Arc<SqliteStorage>, Collaborators)> {
    let storage = Arc::new(
        SqliteStorage::new(Path::new(&config.storage.database_path)).with_context(|| {
            format!("failed to open database {}", config.storage.database_path)
        })?,
    );
    let http = ReqwestTransport::with_defaults().context("failed to build HTTP client")?;

    let collaborators = Collaborators {
        index: storage.clone(),
        parameters: storage.clone(),
        secrets: Arc::new(FileSecretStore::new(&config.storage.secrets_path)),
        events: storage.clone(),
        http: Arc::new(http),
    };
    Ok((storage, collaborators))
}

fn read_event(source: &str) -> anyhow::Result<Value> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read event file {}", source))?
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

fn exit_code(response: &InvocationResponse) -> ExitCode {
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Handles `invoke`: one bounded invocation
async fn handle_invoke(config: &Config, event_source: &str) -> anyhow::Result<ExitCode> {
    let event = read_event(event_source)?;
    let (_, collaborators) = open_collaborators(config)?;

    let response = handle(&event, config, &collaborators).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(exit_code(&response))
}

/// Handles `run`: the initial trigger, then every continuation it schedules
async fn handle_run(config: &Config, trigger: SyncEvent) -> anyhow::Result<ExitCode> {
    let (storage, collaborators) = open_collaborators(config)?;

    let mut invocations = 1;
    let mut response = handle(&serde_json::to_value(&trigger)?, config, &collaborators).await;

    while response.is_success() {
        let Some(entry) = storage.next_pending_event()? else {
            break;
        };
        if entry.source != config.sync.continuation_source {
            tracing::warn!("Skipping event from unrelated source {}", entry.source);
            continue;
        }

        invocations += 1;
        tracing::info!("Delivering continuation event (invocation {})", invocations);
        response = handle(&serde_json::to_value(&entry)?, config, &collaborators).await;
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    tracing::info!("Pass ended after {} invocation(s)", invocations);

    Ok(exit_code(&response))
}

/// Handles `watermark`: prints the stored watermark
async fn handle_watermark(config: &Config) -> anyhow::Result<ExitCode> {
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let watermark = read_watermark(&storage, &config.sync.watermark_parameter).await?;

    if watermark.is_unset() {
        println!("none");
    } else {
        println!("{}", watermark);
    }
    Ok(ExitCode::SUCCESS)
}
