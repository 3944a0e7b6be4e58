//! Weather-Harvest main entry point
//!
//! This is the command-line interface for the per-district weather harvester.

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use weather_harvest::config::{load_config_with_hash, Config};
use weather_harvest::fetch::{BarProgress, BoundedMapper, LogProgress, ProgressObserver, WeatherClient};
use weather_harvest::keys::{load_keys, write_keys};
use weather_harvest::output::{rows_from_results, CsvSink, ResultSink, RunSummary};
use weather_harvest::regions::collect_district_keys;
use weather_harvest::HarvestError;

/// Weather-Harvest: current weather for every district in a key file
///
/// Reads district names from a CSV key file, fetches current weather for
/// each one through a bounded pool of workers with per-request retry, and
/// writes one row per district, failed lookups included.
#[derive(Parser, Debug)]
#[command(name = "weather-harvest")]
#[command(version)]
#[command(about = "Bounded concurrent weather harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl the region API and write the province's districts to the key file
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    collect_districts: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with_all = ["collect_districts", "stats"])]
    dry_run: bool,

    /// Show statistics of the latest run from the database and exit
    #[arg(long, conflicts_with_all = ["collect_districts", "dry_run"])]
    stats: bool,

    /// Log progress instead of drawing a progress bar
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.collect_districts {
        handle_collect_districts(&config).await
    } else {
        let show_bar = !cli.no_progress && !cli.quiet;
        handle_harvest(&config, &config_hash, show_bar).await
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("weather_harvest=info,warn"),
            1 => EnvFilter::new("weather_harvest=debug,info"),
            2 => EnvFilter::new("weather_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config) -> Result<(), HarvestError> {
    println!("=== Weather-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Endpoint: {}", config.api.base_url);
    println!("  Region qualifier: {}", config.api.region_qualifier);
    println!(
        "  API key: {}",
        if config.require_api_key().is_ok() {
            "set"
        } else {
            "MISSING"
        }
    );

    println!("\nFetch:");
    println!("  Workers: {}", config.fetch.workers);
    println!("  Timeout: {}ms", config.fetch.timeout_ms);
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Backoff base: {}ms", config.fetch.backoff_base_ms);
    println!("  Jitter: {}", config.fetch.jitter);

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_path.display());
    if let Some(db) = &config.output.database_path {
        println!("  Database: {}", db.display());
    }
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary.display());
    }

    let keys = load_keys(&config.input.keys_path, &config.input.column)?;
    println!(
        "\nKeys ({} from {}):",
        keys.len(),
        config.input.keys_path.display()
    );
    for key in keys.iter().take(10) {
        println!("  - {}", key);
    }
    if keys.len() > 10 {
        println!("  ... and {} more", keys.len() - 10);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch weather for {} locations", keys.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), HarvestError> {
    use weather_harvest::output::{load_statistics, print_statistics};
    use weather_harvest::storage::open_storage;

    let db_path = config.output.database_path.as_ref().ok_or_else(|| {
        HarvestError::Storage("output.database-path is not configured".to_string())
    })?;

    println!("Database: {}\n", db_path.display());

    let storage = open_storage(db_path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --collect-districts mode: writes the province's districts to the key file
async fn handle_collect_districts(config: &Config) -> Result<(), HarvestError> {
    let regions = config.regions.clone().unwrap_or_default();
    tracing::info!(
        "Collecting districts of {} from {}",
        regions.province,
        regions.base_url
    );

    let keys = collect_district_keys(&regions).await?;
    write_keys(&config.input.keys_path, &config.input.column, &keys)?;

    println!(
        "{} districts saved to {}",
        keys.len(),
        config.input.keys_path.display()
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
    show_bar: bool,
) -> Result<(), HarvestError> {
    // Everything that can fail for the whole run is checked before dispatch
    let api_key = config.require_api_key()?;

    let keys = load_keys(&config.input.keys_path, &config.input.column)?;
    if keys.is_empty() {
        return Err(HarvestError::NoKeys {
            path: config.input.keys_path.clone(),
        });
    }

    let client = WeatherClient::new(&config.api, api_key, &config.fetch)?;
    let mapper = BoundedMapper::new(config.fetch.workers);

    tracing::info!(
        "Fetching weather for {} locations with {} workers",
        keys.len(),
        mapper.width()
    );

    let mut observer: Box<dyn ProgressObserver> = if show_bar {
        Box::new(BarProgress::new())
    } else {
        Box::new(LogProgress::default())
    };

    let started_at = Utc::now();
    let results = mapper.run(Arc::new(client), keys, observer.as_mut()).await;
    let finished_at = Utc::now();

    let rows = rows_from_results(results);
    let mut summary = RunSummary::from_rows(&rows, started_at, finished_at, config_hash);

    let mut csv = CsvSink::new(&config.output.results_path);
    csv.write_rows(&rows)?;
    tracing::debug!("Wrote {} rows via {} sink", rows.len(), csv.name());

    if let Some(db_path) = &config.output.database_path {
        use weather_harvest::output::SqliteSink;
        use weather_harvest::storage::open_storage;

        let mut sink = SqliteSink::new(open_storage(db_path)?, config_hash);
        sink.write_rows(&rows)?;
        summary.run_id = sink.last_run_id();
        tracing::info!("Recorded run in {}", db_path.display());
    }

    if let Some(summary_path) = &config.output.summary_path {
        use weather_harvest::output::generate_markdown_summary;

        generate_markdown_summary(&summary, summary_path)?;
        tracing::info!("Summary written to {}", summary_path.display());
    }

    println!(
        "{} rows saved to {}",
        rows.len(),
        config.output.results_path.display()
    );
    println!("{}", summary.failure_line());
    if summary.failed > 0 {
        tracing::warn!("Failed locations have the Error column set");
    }

    Ok(())
}
