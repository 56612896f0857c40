use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, FetchArgs, parse_tab};
use config::Config;

use tabfetch::domain::{DrainEvent, EventSink};
use tabfetch::provider::{HttpProvider, MockProvider, TabProvider};
use tabfetch::scheduler::{
    AdmissionController, DrainScheduler, DrainStatus, PreviewLoader, ProgressReporter, RateBudget,
};
use tabfetch::state::DrainContext;

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabfetch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tabfetch.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_provider(args: &FetchArgs, config: &Config) -> Result<Arc<dyn TabProvider>> {
    if args.dry_run {
        info!("Dry run: using in-memory provider");
        return Ok(Arc::new(MockProvider::new()));
    }
    let provider = HttpProvider::new(&config.provider).context("Failed to create HTTP provider")?;
    Ok(Arc::new(provider))
}

fn build_admission(config: &Config, sink: EventSink) -> Result<AdmissionController> {
    let budget = RateBudget::new(config.budget).context("Invalid budget configuration")?;
    Ok(AdmissionController::new(
        budget,
        ProgressReporter::new(sink),
        config.admission,
    ))
}

fn render_event(event: &DrainEvent, verbose: bool) -> Result<()> {
    match event {
        DrainEvent::Result(result) => {
            println!("{}", serde_json::to_string(result).context("Failed to encode result")?);
        }
        DrainEvent::Progress(message) if !message.is_empty() => {
            eprintln!("{}", message.yellow());
        }
        DrainEvent::ErrorsChanged(entries) if verbose => {
            eprintln!("{} {} tab error(s) recorded", "Ledger:".cyan(), entries.len());
        }
        _ => {}
    }
    Ok(())
}

async fn handle_fetch_command(args: &FetchArgs, tabs: &[String], verbose: bool, config: &Config) -> Result<()> {
    info!("Fetching {} tabs from league {}", tabs.len(), args.league);

    let provider = build_provider(args, config)?;
    let (sink, mut events) = EventSink::channel();
    let admission = build_admission(config, sink.clone())?;

    let context = DrainContext::new(args.league.clone(), sink);
    context.set_mode(args.mode());
    for arg in tabs {
        context.select(parse_tab(arg));
    }

    let scheduler = DrainScheduler::new(provider, admission, context.clone()).with_config(config.drain);
    let mut handle = scheduler.start();

    let joined = loop {
        tokio::select! {
            Some(event) = events.recv() => render_event(&event, verbose)?,
            joined = &mut handle => break joined.context("Drain task panicked")?,
        }
    };
    while let Ok(event) = events.try_recv() {
        render_event(&event, verbose)?;
    }

    for entry in context.errors() {
        eprintln!("{} {}: {}", "Failed:".red(), entry.item, entry.message);
    }

    let status = match joined {
        Err(err) if err.is_fatal_fetch() => {
            eprintln!("{} {} tab(s) left unfetched", "Aborted:".red(), context.queue_len());
            return Err(err).context("Drain aborted");
        }
        other => other.context("Drain failed")?,
    };

    match status {
        DrainStatus::Completed(summary) => {
            eprintln!(
                "{} {} fetched, {} failed, {} discarded",
                "Done:".green(),
                summary.fetched,
                summary.failed,
                summary.discarded
            );
            Ok(())
        }
        DrainStatus::AlreadyDraining => Err(eyre!("A drain was already running")),
    }
}

async fn handle_preview_command(args: &FetchArgs, id: &str, config: &Config) -> Result<()> {
    info!("Previewing tab {} from league {}", id, args.league);

    let provider = build_provider(args, config)?;
    let (sink, _events) = EventSink::channel();
    let admission = build_admission(config, sink.clone())?;
    let loader = PreviewLoader::new(provider, admission, sink);

    let payload = loader
        .load_one(id, &args.league, args.mode())
        .await
        .context(format!("Failed to load tab {}", id))?;

    info!("Loaded {} for tab {}", payload.mode(), id);
    let rendered = serde_json::to_string_pretty(payload.data()).context("Failed to encode payload")?;
    println!("{}", rendered);
    Ok(())
}

fn handle_config_command(config: &Config) -> Result<()> {
    let rendered = serde_yaml::to_string(config).context("Failed to encode configuration")?;
    print!("{}", rendered);
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        eprintln!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Fetch { args, tabs } => handle_fetch_command(args, tabs, cli.is_verbose(), config).await,
        Commands::Preview { args, id } => handle_preview_command(args, id, config).await,
        Commands::Config => handle_config_command(config),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
