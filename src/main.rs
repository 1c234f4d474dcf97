//! Finsight-Crawl command-line interface

use anyhow::{bail, Context};
use clap::Parser;
use finsight_crawl::browser::{BrowserDriver, HttpBrowser, WebDriverBrowser};
use finsight_crawl::config::{load_config_with_hash, Config, DriverKind, YAHOO_FINANCE};
use finsight_crawl::extractor::Concurrency;
use finsight_crawl::llm::{OpenAiClient, TextGenerator};
use finsight_crawl::pipeline::{NewsPipeline, RunOverrides, SiteProfile};
use finsight_crawl::storage::{open_storage, ArticleStore, RunStatus};
use finsight_crawl::FinsightError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Finsight-Crawl: financial news exploration and ingestion
///
/// Discovers article links on a news site, extracts each article into a
/// structured record and stores the records in a local collection.
#[derive(Parser, Debug)]
#[command(name = "finsight-crawl")]
#[command(version)]
#[command(about = "Financial news exploration and ingestion", long_about = None)]
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

    /// Print the available profile names and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "show"])]
    list_profiles: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "show"])]
    dry_run: bool,

    /// Show per-collection article counts and exit
    #[arg(long, conflicts_with = "show")]
    stats: bool,

    /// Print the most recently ingested articles of a collection
    #[arg(long, value_name = "COLLECTION")]
    show: Option<String>,

    /// Number of articles printed by --show
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Site profile to run
    #[arg(long, default_value = YAHOO_FINANCE)]
    profile: String,

    /// Scroll discovery budget in seconds
    #[arg(long)]
    duration_seconds: Option<u64>,

    /// Pause between scrolls in seconds (fractions allowed)
    #[arg(long, value_name = "SECONDS")]
    scroll_interval: Option<f64>,

    /// Maximum number of articles to extract
    #[arg(long)]
    max_articles: Option<usize>,

    /// Collection the articles are ingested into
    #[arg(long, default_value = "NewsExample")]
    collection_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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

    if cli.list_profiles {
        handle_list_profiles(&config);
    } else if cli.dry_run {
        handle_dry_run(&config, &cli)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(collection) = &cli.show {
        handle_show(&config, collection, cli.limit)?;
    } else {
        handle_ingest(&config, &config_hash, &cli).await?;
    }

    Ok(())
}

/// Sets up the tracing subscriber; `RUST_LOG` wins over the verbosity flags
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "finsight_crawl=info,warn",
            1 => "finsight_crawl=debug,info",
            2 => "finsight_crawl=trace,debug",
            _ => "trace",
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_list_profiles(config: &Config) {
    for profile in config.all_profiles() {
        println!("{}", profile.name);
    }
}

fn handle_dry_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let profile = resolve_profile(config, &cli.profile)?;
    let overrides = overrides_from(cli)?;

    println!("=== Finsight-Crawl Dry Run ===\n");

    println!("Browser:");
    println!("  Driver: {:?}", config.browser.driver);
    if config.browser.driver == DriverKind::Webdriver {
        println!("  WebDriver: {}", config.browser.webdriver_url);
        println!("  Browser: {:?}", config.browser.browser_name);
    }
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nProfile '{}':", profile.name);
    println!("  Seed: {}", profile.seed_url);
    println!("  Article prefix: {}", profile.article_prefix);
    println!(
        "  Max articles: {}",
        overrides.max_articles.unwrap_or(profile.max_articles)
    );
    match &profile.deep {
        Some(deep) => println!(
            "  Discovery: deep (depth {}, {} pages)",
            deep.filter().max_depth,
            deep.filter().max_pages
        ),
        None => println!(
            "  Discovery: scroll for {:?} every {:?}",
            overrides.duration.unwrap_or(profile.duration),
            overrides.scroll_interval.unwrap_or(profile.scroll_interval)
        ),
    }
    println!("  Extraction: {}", profile.extraction.name());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Collection: {}", cli.collection_name);

    println!("\n✓ Configuration is valid");
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_storage(Path::new(&config.storage.database_path))?;
    let collections = store.list_collections()?;
    if collections.is_empty() {
        println!("No articles stored yet");
    }
    for (collection, count) in collections {
        println!("{:<24} {:>8}", collection, count);
    }
    Ok(())
}

fn handle_show(config: &Config, collection: &str, limit: usize) -> anyhow::Result<()> {
    let store = open_storage(Path::new(&config.storage.database_path))?;
    let articles = store.recent_articles(collection, limit)?;
    if articles.is_empty() {
        println!("No articles in '{}'", collection);
    }
    for article in articles {
        println!("{}", article.title.as_deref().unwrap_or("(untitled)"));
        println!("  {}", article.url);
        if let Some(published) = article.published_at.as_deref().or(article.raw_date.as_deref()) {
            println!("  published {}", published);
        }
        println!("  ingested {}", article.ingested_at);
    }
    Ok(())
}

async fn handle_ingest(config: &Config, config_hash: &str, cli: &Cli) -> anyhow::Result<()> {
    let profile = resolve_profile(config, &cli.profile)?;
    let overrides = overrides_from(cli)?;

    let driver = build_driver(config)?;
    let mut pipeline = NewsPipeline::new(driver)
        .with_concurrency(Concurrency::from_limit(config.extraction.concurrency))
        .with_dedupe(config.extraction.dedupe);
    if let Some(llm) = build_llm(config)? {
        pipeline = pipeline.with_llm(llm);
    }

    let mut store = open_storage(Path::new(&config.storage.database_path))?;
    let run_id = store.create_run(&profile.name, config_hash)?;
    tracing::info!(run_id, profile = %profile.name, "Run started");

    let report = match pipeline.run(&profile, &overrides).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            store.complete_run(run_id, RunStatus::Failed, 0, 0)?;
            return Err(e.into());
        }
    };

    println!(
        "Extracted {} articles (requested {})",
        report.obtained(),
        report.requested
    );

    let ingested = store.upsert_articles(&cli.collection_name, Some(run_id), &report.articles)?;
    let status = if report.is_partial() {
        RunStatus::Partial
    } else {
        RunStatus::Completed
    };
    store.complete_run(run_id, status, report.requested, report.obtained())?;

    println!(
        "Ingested {} articles into '{}'",
        ingested, cli.collection_name
    );
    Ok(())
}

fn resolve_profile(config: &Config, name: &str) -> anyhow::Result<SiteProfile> {
    let profile = config
        .find_profile(name)
        .ok_or_else(|| FinsightError::UnknownProfile(name.to_string()))?;
    SiteProfile::from_config(&profile)
        .with_context(|| format!("could not prepare profile '{}'", name))
}

/// Turns the command-line overrides into run settings
///
/// Mirrors the config rules: every override must be at least one unit.
fn overrides_from(cli: &Cli) -> anyhow::Result<RunOverrides> {
    let scroll_interval = match cli.scroll_interval {
        Some(seconds) if !seconds.is_finite() || seconds <= 0.0 => {
            bail!("--scroll-interval must be a positive number of seconds")
        }
        Some(seconds) => match Duration::try_from_secs_f64(seconds) {
            Ok(interval) => Some(interval),
            Err(e) => bail!("--scroll-interval {} is out of range: {}", seconds, e),
        },
        None => None,
    };
    if cli.duration_seconds == Some(0) {
        bail!("--duration-seconds must be >= 1");
    }
    if cli.max_articles == Some(0) {
        bail!("--max-articles must be >= 1");
    }

    Ok(RunOverrides {
        duration: cli.duration_seconds.map(Duration::from_secs),
        scroll_interval,
        max_articles: cli.max_articles,
    })
}

fn build_driver(config: &Config) -> anyhow::Result<Arc<dyn BrowserDriver>> {
    let driver: Arc<dyn BrowserDriver> = match config.browser.driver {
        DriverKind::Webdriver => {
            tracing::info!(endpoint = %config.browser.webdriver_url, "Using WebDriver browser");
            Arc::new(WebDriverBrowser::new(&config.browser, &config.user_agent)?)
        }
        DriverKind::Http => {
            tracing::info!("Using HTTP browser (no script execution)");
            Arc::new(HttpBrowser::new(
                &config.user_agent,
                Duration::from_millis(config.browser.page_timeout_ms),
            )?)
        }
    };
    Ok(driver)
}

fn build_llm(config: &Config) -> anyhow::Result<Option<Arc<dyn TextGenerator>>> {
    match &config.llm {
        Some(llm) => {
            let client = OpenAiClient::from_config(llm)?;
            tracing::info!(model = %llm.model, "LLM enabled");
            Ok(Some(Arc::new(client)))
        }
        None => Ok(None),
    }
}
