use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use enphase_loader::cli::Cli;
use enphase_loader::config::Config;
use enphase_loader::db::{GenerationRepository, SchemaMapping};
use enphase_loader::fetcher::EnphaseClient;
use enphase_loader::loaders::DetailLoader;
use enphase_loader::rate_gate::{RateGate, SystemClock};
use enphase_loader::services::CollectionService;
use enphase_loader::shutdown::{forward_interrupts, InterruptOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists (ignore errors if not found)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,enphase_loader=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[instrument(skip(cli))]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Argument errors come first, before the environment is even read
    cli.preflight(Utc::now())?;

    let config = Config::from_env()?;
    info!("Starting Enphase loader with config: {:?}", config);

    // Validate the requested range before touching the API or the database
    let today = Utc::now().with_timezone(&config.timezone).date_naive();
    let window = cli.collection_window(today)?;
    info!(
        "Ready to go starting on {} and ending on {} (interval {} days)",
        window.start(),
        window.last_day(),
        window.day_count()
    );

    let schema = SchemaMapping::in_schema(&config.generation_schema)?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;
    info!("Database connection established");

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations completed");

    let repository = GenerationRepository::new(pool, schema);
    let client = EnphaseClient::from_config(&config)?;
    let gate = RateGate::new(SystemClock, config.min_call_interval());
    info!("Pacing collection days {}s apart", gate.min_interval().as_secs());

    let progress = ProgressBar::new(window.day_count() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut service = CollectionService::new(
        client,
        repository,
        gate,
        DetailLoader::new(config.timezone),
    )
    .with_progress(progress.clone());

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if forward_interrupts(tokio::signal::ctrl_c, stop_tx).await == InterruptOutcome::ForceQuit
        {
            std::process::exit(130);
        }
    });

    let result = service.run(&window, stop_rx).await;
    progress.finish_and_clear();
    let report = result?;

    info!(
        "Loaded {} of {} days ({} intervals, {} dropped outside their day)",
        report.days_loaded.len(),
        window.day_count(),
        report.intervals_loaded,
        report.intervals_dropped
    );
    if report.cancelled {
        warn!("Run was stopped before {}", window.last_day());
    }

    Ok(())
}
