//! Binary entry point for newtype.
//!
//! This binary hosts the atmosphere engine on a stream of host events.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use newtype::config::NewtypeConfig;
use newtype::engine::{Engine, Notice, Notifier};
use newtype::models::HostEvent;
use newtype::observability;
use newtype::{AtmosphereEvent, HttpAnalysisClient, ServiceConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

/// Newtype - real-time atmosphere detection for roleplay chat.
#[derive(Parser)]
#[command(name = "newtype")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Drive an engine from newline-delimited JSON host events.
    Run {
        /// Read events from this file instead of stdin.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Start the engine before reading any event.
        #[arg(long)]
        autostart: bool,

        /// Analysis service base URL.
        #[arg(long, env = "NEWTYPE_SERVICE_URL")]
        service: Option<String>,
    },

    /// Query the analysis service status endpoint.
    Status {
        /// Analysis service base URL.
        #[arg(long, env = "NEWTYPE_SERVICE_URL")]
        service: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Notifier that prints notices to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: &Notice) {
        eprintln!("{notice}");
    }
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is the common case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Run {
            input,
            autostart,
            service,
        } => cmd_run(config, input, autostart, service).await,
        Commands::Status { service } => cmd_status(config, service).await,
        Commands::Config { show } => cmd_config(&config, show),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> Result<NewtypeConfig, Box<dyn std::error::Error>> {
    if let Some(config_path) = path {
        return NewtypeConfig::load_from_file(std::path::Path::new(config_path))
            .map_err(Into::into);
    }

    if let Ok(config_path) = std::env::var("NEWTYPE_CONFIG_PATH")
        && !config_path.trim().is_empty()
    {
        return NewtypeConfig::load_from_file(std::path::Path::new(&config_path))
            .map_err(Into::into);
    }

    Ok(NewtypeConfig::load_default())
}

fn service_config(config: &NewtypeConfig, url: Option<String>) -> ServiceConfig {
    match url {
        Some(url) => config.service.clone().with_base_url(url),
        None => config.service.clone(),
    }
}

/// Run command.
async fn cmd_run(
    config: NewtypeConfig,
    input: Option<PathBuf>,
    autostart: bool,
    service: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_config(&config, service);
    let client = tokio::task::spawn_blocking(move || HttpAnalysisClient::new(service)).await?;
    let (handle, engine_task) = Engine::builder(config.engine.clone(), Arc::new(client))
        .with_notifier(Arc::new(StderrNotifier))
        .spawn()?;

    let printer = tokio::spawn(print_events(handle.subscribe()));

    if autostart {
        handle.start().await?;
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(&path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();
    let mut line_no = 0_usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match HostEvent::parse(&line) {
            Ok(event) => handle.apply(event).await?,
            Err(e) => tracing::warn!(line = line_no, error = %e, "Skipping host event"),
        }
    }

    tracing::debug!(lines = line_no, "End of input");
    handle.shutdown().await?;
    drop(handle);
    engine_task.await?;
    printer.await?;
    Ok(())
}

/// Prints every bus event as one JSON line until the bus closes.
async fn print_events(mut events: broadcast::Receiver<AtmosphereEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged behind");
            },
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Status command.
async fn cmd_status(
    config: NewtypeConfig,
    service: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = service_config(&config, service);
    let url = service.status_url();
    let status =
        tokio::task::spawn_blocking(move || HttpAnalysisClient::new(service).status()).await??;

    println!("Analysis Service: {url}");
    if status.is_empty() {
        println!("  (empty status)");
    }
    for (key, value) in &status {
        println!("  {key}: {value}");
    }
    Ok(())
}

/// Config command.
fn cmd_config(config: &NewtypeConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !show {
        println!("Use --show to display current configuration");
        return Ok(());
    }

    let engine = &config.engine;
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Engine:");
    println!("  Analysis Interval: {}ms", engine.analysis_interval_ms());
    println!("  Buffer Size: {}", engine.buffer_size);
    println!("  Min Messages: {}", engine.min_messages);
    println!("  Min Message Length: {}", engine.min_message_length);
    println!("  Highlight Threshold: {}", engine.highlight_threshold);
    println!("  Continuity Tail: {}", engine.continuity_tail);
    println!();

    let service = &config.service;
    println!("Analysis Service:");
    println!("  Analyze URL: {}", service.analyze_url());
    println!("  Status URL: {}", service.status_url());
    if service.timeout_ms == 0 {
        println!("  Timeout: none");
    } else {
        println!("  Timeout: {}ms", service.timeout_ms);
    }
    println!("  Connect Timeout: {}ms", service.connect_timeout_ms);
    println!();

    let logging = &config.logging;
    println!("Logging:");
    println!(
        "  Format: {}",
        logging.format.as_deref().unwrap_or("(default)")
    );
    println!(
        "  File: {}",
        logging
            .file
            .as_ref()
            .map_or_else(|| "(stderr)".to_string(), |p| p.display().to_string())
    );
    println!(
        "  Filter: {}",
        logging.filter.as_deref().unwrap_or("(default)")
    );
    Ok(())
}
