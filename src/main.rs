//! sitescribe: sitemap-driven crawler producing a canonical Markdown
//! archive.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sitescribe::{
    config::{Config, CrawlConfig, LogLevel, LoggingConfig},
    crawler::{CrawlOrchestrator, CrawlRequest},
    fetch::{FetchConfig, FetchEngine, FetchMode},
    sitemap::SitemapIntake,
    store::{CrawlRun, PageStore},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sitescribe")]
#[command(about = "Sitemap-driven crawler producing a canonical Markdown archive")]
#[command(version)]
struct Cli {
    /// Seed sitemap URL (repeat for multiple sitemaps)
    #[arg(long = "sitemap", required = true)]
    sitemaps: Vec<String>,

    /// Run-wide cap on fetched pages
    #[arg(long, default_value = "10000")]
    max_pages: usize,

    /// Fetch mode: static or browser
    #[arg(long, default_value = "static")]
    fetch_mode: FetchMode,

    /// Verbose logs
    #[arg(long)]
    debug: bool,

    /// Sitemap intake only: print the first 10 URLs, no database writes
    #[arg(long)]
    dry_run: bool,

    /// Re-crawl pages that already exist (updates stay hash-gated)
    #[arg(long)]
    recrawl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig::from_env(), cli.debug);

    let crawl_defaults = CrawlConfig::default();
    let fetch_config = FetchConfig {
        user_agent: crawl_defaults.user_agent.clone(),
        timeout: Duration::from_secs(crawl_defaults.request_timeout_secs),
        ..FetchConfig::default()
    };
    let fetcher = Arc::new(FetchEngine::new(fetch_config).context("failed to build HTTP client")?);

    info!("Resolving {} seed sitemap(s)", cli.sitemaps.len());
    let intake = SitemapIntake::new();
    let entries = intake
        .collect(&fetcher, &cli.sitemaps)
        .await
        .context("sitemap intake failed")?;
    info!("Discovered {} unique URLs", entries.len());

    if cli.dry_run {
        println!("Dry run: discovered {} URLs", entries.len());
        for entry in entries.iter().take(10) {
            match entry.type_hint {
                Some(hint) => println!("  {} [{}]", entry.canonical, hint),
                None => println!("  {}", entry.canonical),
            }
        }
        return Ok(());
    }

    // The database is only touched past this point
    let config = Config::from_env(cli.max_pages, cli.fetch_mode, cli.recrawl)
        .context("configuration error")?;

    let store = Arc::new(
        PageStore::connect(&config.database)
            .await
            .context("database unreachable")?,
    );

    let run = CrawlRun::new(cli.sitemaps.clone(), cli.max_pages, cli.fetch_mode);
    store
        .create_run(&run)
        .await
        .context("failed to create run record")?;
    info!(run_id = %run.run_id, "Starting crawl");

    let orchestrator = Arc::new(CrawlOrchestrator::new(
        Arc::clone(&store),
        fetcher,
        config.crawl.clone(),
    ));

    let request = CrawlRequest {
        entries,
        run_id: run.run_id,
        max_pages: cli.max_pages,
        fetch_mode: cli.fetch_mode,
        recrawl: cli.recrawl,
    };

    let report = orchestrator.run(request).await;

    if let Err(e) = store.update_run_stats(run.run_id, &report.counters).await {
        warn!("Failed to write run stats: {}", e);
    }
    if let Err(e) = store.finish_run(run.run_id).await {
        warn!("Failed to close run record: {}", e);
    }

    report.print_summary();
    Ok(())
}

fn init_logging(config: &LoggingConfig, debug: bool) {
    let level = if debug { LogLevel::Debug } else { config.level };
    let filter = EnvFilter::try_new(level.as_str()).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.pretty {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
