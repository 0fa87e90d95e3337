//! wp-harvest main entry point
//!
//! This is the command-line interface for the incremental WordPress harvester.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use wp_harvest::config::{load_config_with_hash, Config};
use wp_harvest::output::{load_statistics, print_statistics};
use wp_harvest::{site_key, Coordinator, HarvestError, JsonFileStore, SiteEndpoints};

/// Exit status after Ctrl-C
const EXIT_INTERRUPTED: i32 = 130;

/// wp-harvest: an incremental WordPress article harvester
///
/// Pages through the REST posts endpoint of every configured site and keeps
/// one deduplicated JSON dataset per site. The first run of a site fetches
/// everything; later runs stop at the first page of already stored posts.
#[derive(Parser, Debug)]
#[command(name = "wp-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental WordPress article harvester", long_about = None)]
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

    /// Only harvest these configured sites (repeatable)
    #[arg(long = "site", value_name = "SITE")]
    sites: Vec<String>,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the stored datasets and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let config = select_sites(config, &cli.sites)?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wp_harvest=info,warn"),
            1 => EnvFilter::new("wp_harvest=debug,info"),
            2 => EnvFilter::new("wp_harvest=trace,debug"),
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

/// Restricts the configured sites to the ones named with `--site`
///
/// Sites are matched by site key, so `kurir.mk` and `https://kurir.mk/` name
/// the same entry.
fn select_sites(mut config: Config, requested: &[String]) -> anyhow::Result<Config> {
    if requested.is_empty() {
        return Ok(config);
    }

    let wanted: Vec<String> = requested.iter().map(|s| site_key(s)).collect();
    for (name, key) in requested.iter().zip(&wanted) {
        if !config.sites.iter().any(|entry| &site_key(&entry.domain) == key) {
            bail!("Site {} is not in the configuration", name);
        }
    }

    config
        .sites
        .retain(|entry| wanted.contains(&site_key(&entry.domain)));
    tracing::info!("Restricted run to {} sites", config.sites.len());
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let harvester = &config.harvester;
    let store = JsonFileStore::new(config.output.data_dir.clone());

    println!("=== wp-harvest Dry Run ===\n");

    println!("Harvester Configuration:");
    println!("  Posts per page: {}", harvester.posts_per_page);
    println!(
        "  Max concurrent requests: {}",
        harvester.max_concurrent_requests
    );
    println!("  Request timeout: {}s", harvester.request_timeout);
    println!("  Max retries: {}", harvester.max_retries);
    println!("  Backoff unit: {}ms", harvester.backoff_base_ms);
    println!("  Category page size: {}", harvester.category_page_size);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Accept: {}", config.http.accept);
    println!("  Accept-Language: {}", config.http.accept_language);

    println!("\nOutput:");
    println!("  Data directory: {}", config.output.data_dir.display());

    println!("\nSites ({}):", config.sites.len());
    for entry in &config.sites {
        let endpoints = SiteEndpoints::for_site(&entry.domain)?;
        let key = site_key(&entry.domain);
        let path = store.dataset_path(&key);
        let state = if path.exists() {
            "incremental"
        } else {
            "first run"
        };
        println!("  - {} ({})", entry.domain, state);
        println!("    * posts: {}", endpoints.posts);
        println!("    * categories: {}", endpoints.categories);
        println!("    * dataset: {}", path.display());
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} sites", config.sites.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics of every site's dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = JsonFileStore::new(config.output.data_dir.clone());

    println!("Data directory: {}\n", config.output.data_dir.display());

    for entry in &config.sites {
        let stats = load_statistics(&store, &entry.domain)
            .with_context(|| format!("Failed to read dataset of {}", entry.domain))?;
        print_statistics(&stats);
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} sites into {}",
        config.sites.len(),
        config.output.data_dir.display()
    );

    let coordinator = Coordinator::with_json_store(config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match coordinator.run_with_shutdown(shutdown).await {
        Ok(summary) => {
            tracing::info!(
                "Harvest completed: {}/{} sites",
                summary.successful(),
                summary.total_sites
            );
            Ok(())
        }
        Err(HarvestError::Interrupted { site }) => {
            tracing::warn!("Harvest interrupted by user while processing {}", site);
            process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
