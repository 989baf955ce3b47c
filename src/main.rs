//! Flatwatch main entry point
//!
//! This is the command-line interface for the Flatwatch apartment-listing watcher.

use anyhow::Context;
use clap::Parser;
use flatwatch::config::{load_config_with_hash, resolve_sources, Config};
use flatwatch::crawler::build_orchestrator;
use flatwatch::output::{
    build_notifier, dispatch, load_statistics, log_report, print_statistics, MessageRenderer,
    RunReport,
};
use flatwatch::storage::open_store;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Flatwatch: an apartment-listing watcher
///
/// Flatwatch periodically crawls real-estate search pages, remembers which listings it
/// has already seen, and reports new listings that match the configured criteria.
#[derive(Parser, Debug)]
#[command(name = "flatwatch")]
#[command(version)]
#[command(about = "Watches real-estate search pages for new listings", long_about = None)]
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

    /// Run a single pass over all sources and exit
    #[arg(long)]
    once: bool,

    /// Forget all seen listings of the configured sources before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "once", "fresh"])]
    dry_run: bool,

    /// Show how many listings each source has seen and exit
    #[arg(long, conflicts_with_all = ["dry_run", "once", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_watch(config, cli.once, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("flatwatch=info,warn"),
            1 => EnvFilter::new("flatwatch=debug,info"),
            2 => EnvFilter::new("flatwatch=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved sources
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let specs = resolve_sources(config)?;

    println!("=== Flatwatch Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Result limit: {}", config.crawler.result_limit);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unbounded"),
    }
    println!("  Page ceiling: {}", config.crawler.page_ceiling);
    println!(
        "  Fetch attempts: {} ({}ms apart, {}s timeout)",
        config.crawler.fetch_attempts, config.crawler.retry_delay, config.crawler.request_timeout
    );
    println!("  Loop period: {}s", config.crawler.loop_period);

    println!("\nStore:");
    println!(
        "  {:?} at {}",
        config.store.backend,
        config.store.path.display()
    );

    println!("\nNotifications:");
    match &config.notify.webhook_url {
        Some(url) => println!("  Webhook: {}", url),
        None => println!("  Log only"),
    }

    println!("\nSources ({}):", specs.len());
    for spec in &specs {
        println!(
            "  - {} ({:?}, max pages {:?}, details {}, auto-submit {})",
            spec.name,
            spec.pagination,
            spec.max_pages,
            spec.details.is_some(),
            spec.auto_submit
        );
        for url in &spec.urls {
            println!("    * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} search URLs",
        specs.iter().map(|s| s.urls.len()).sum::<usize>()
    );

    Ok(())
}

/// Handles the --stats mode: shows the seen-store contents per source
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Store: {}\n", config.store.path.display());

    let store = open_store(&config.store)?;
    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main watch loop
async fn handle_watch(config: Config, once: bool, fresh: bool) -> anyhow::Result<()> {
    let specs = resolve_sources(&config)?;
    let store = open_store(&config.store)
        .with_context(|| format!("Failed to open store {}", config.store.path.display()))?;

    if fresh {
        tracing::info!("Starting fresh (forgetting seen listings)");
        for spec in &specs {
            store.clear(&spec.name)?;
        }
    }

    let orchestrator = build_orchestrator(&config, store)?;
    let notifier = build_notifier(&config)?;
    let renderer = MessageRenderer::new(config.message.template.clone());
    let period = Duration::from_secs(config.crawler.loop_period);

    tracing::info!(
        "Watching {} sources, {} search URLs",
        specs.len(),
        specs.iter().map(|s| s.urls.len()).sum::<usize>()
    );

    loop {
        let started = Instant::now();
        let attempts = orchestrator.crawl_all(&specs).await;

        for attempt in &attempts {
            if let Ok(outcome) = &attempt.result {
                dispatch(notifier.as_ref(), &renderer, &outcome.accepted).await;
            }
        }

        let report = RunReport::from_attempts(&attempts, started.elapsed());
        log_report(&report);

        if once {
            if report.has_failures() {
                anyhow::bail!("some sources could not read or write their seen state");
            }
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}
