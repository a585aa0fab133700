use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, LevelFilter};
use radar_mottu::api::{self, AppState};
use radar_mottu::config::Config;
use radar_mottu::database::Database;
use radar_mottu::estimator::{is_plausible_reading, DistanceEstimator};
use radar_mottu::report::ReportGenerator;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "radar-mottu")]
#[command(author = "spikehead")]
#[command(version = "0.1.0")]
#[command(about = "Fleet tracking backend for motorcycles, BLE tags and anchor beacons")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Listen address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Database file (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve,

    /// Write a default configuration file
    Init,

    /// Estimate distance for one or more RSSI readings
    Estimate {
        /// Signal strength in dBm (e.g. -65)
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        rssi: Vec<f64>,
    },

    /// Show database statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    // Handle init command before loading config
    if matches!(cli.command, Commands::Init) {
        return handle_init(&cli.config);
    }

    // Load configuration
    let mut config = if cli.config.exists() {
        Config::load(&cli.config).context("Failed to load config")?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    // Override config with CLI args
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        config.database.path = database.to_string_lossy().to_string();
    }

    match cli.command {
        Commands::Serve => handle_serve(config).await,
        Commands::Init => unreachable!(),
        Commands::Estimate { rssi } => handle_estimate(&rssi),
        Commands::Stats => handle_stats(config),
    }
}

async fn handle_serve(config: Config) -> Result<()> {
    let db = Database::open(&config.database.path).context("Failed to open database")?;

    if config.database.seed_demo_data {
        db.seed_demo_data().context("Failed to seed demo data")?;
    }

    let estimator = DistanceEstimator::new().context("Failed to fit distance model")?;
    info!("Distance model ready ({:?})", estimator.model().kind());

    let state = AppState::new(db, estimator, &config);
    api::serve(&config.server.bind_addr, state).await
}

fn handle_estimate(readings: &[f64]) -> Result<()> {
    let estimator = DistanceEstimator::new().context("Failed to fit distance model")?;
    let mut stdout = io::stdout();
    let mut failed = 0;

    for &rssi in readings {
        if !is_plausible_reading(rssi) {
            error!("Rejected reading {} dBm: RSSI must be negative", rssi);
            failed += 1;
            continue;
        }

        match estimator.estimate(rssi) {
            Ok(meters) => ReportGenerator::print_estimate(&mut stdout, rssi, meters)?,
            Err(e) => {
                error!("{}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} readings could not be estimated", failed, readings.len());
    }

    Ok(())
}

fn handle_stats(config: Config) -> Result<()> {
    let db = Database::open(&config.database.path).context("Failed to open database")?;
    let stats = db.stats()?;
    ReportGenerator::generate_stats(&mut io::stdout(), &stats)
}

fn handle_init(path: &Path) -> Result<()> {
    info!("Initializing radar-mottu configuration...");

    if path.exists() {
        info!("{:?} already exists, leaving it untouched", path);
        return Ok(());
    }

    Config::default().save(path)?;
    info!("Created {:?}", path);
    info!("Edit it to change the signing key and operator credentials.");
    info!("Run 'radar-mottu serve' to start the API.");

    Ok(())
}
