//! webtrail entry point.
//!
//! Parses arguments, loads layered configuration, and drives the
//! history search pipeline. Logging goes to stderr so report output can
//! be piped from stdout.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use webtrail_client::fetch::{FetchClient, FetchConfig, FetchPool};
use webtrail_client::pipeline::{SearchOptions, run_search};
use webtrail_client::extract::ExtractConfig;
use webtrail_core::matcher::{KeywordQuery, MatchMode};
use webtrail_core::{AppConfig, PageStore};
use webtrail_history::{Browser, HistorySource};

mod report;

#[derive(Parser)]
#[command(name = "webtrail", version, about = "Search the pages in your browsing history")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search recent history pages for keywords.
    Search(SearchArgs),
    /// Inspect or prune the page cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Keywords to search for.
    #[arg(required = true)]
    keywords: Vec<String>,

    /// How many days of history to search.
    #[arg(long)]
    days: Option<i64>,

    /// Require all keywords or any keyword.
    #[arg(long, value_enum, default_value = "all")]
    mode: ModeArg,

    /// Maximum simultaneous fetches.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Response size ceiling in bytes.
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Re-fetch cache entries older than this many hours.
    #[arg(long)]
    cache_max_age_hours: Option<i64>,

    /// Characters of context captured around each match.
    #[arg(long)]
    context: Option<usize>,

    /// Never touch the network; accept stale cache entries.
    #[arg(long)]
    cache_only: bool,

    /// Re-fetch every page even when the cache is fresh.
    #[arg(long, conflicts_with = "cache_only")]
    force_refresh: bool,

    /// Which browser histories to read.
    #[arg(long, value_enum, default_value = "all")]
    browser: BrowserArg,

    /// Explicit history database path, bypassing discovery (repeatable).
    /// The browser family is inferred from the filename.
    #[arg(long)]
    profile: Vec<PathBuf>,

    /// Cache database path.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit JSON instead of HTML.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    All,
    Any,
}

impl From<ModeArg> for MatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => MatchMode::All,
            ModeArg::Any => MatchMode::Any,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BrowserArg {
    Firefox,
    Chrome,
    Chromium,
    All,
}

impl BrowserArg {
    fn browsers(self) -> Vec<Browser> {
        match self {
            BrowserArg::Firefox => vec![Browser::Firefox],
            BrowserArg::Chrome => vec![Browser::Chrome],
            BrowserArg::Chromium => vec![Browser::Chromium],
            BrowserArg::All => vec![Browser::Firefox, Browser::Chrome, Browser::Chromium],
        }
    }
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Print entry count, total bytes, and age range.
    Stats {
        /// Cache database path.
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Delete entries fetched more than N days ago.
    Clean {
        #[arg(long)]
        older_than_days: i64,

        /// Cache database path.
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    match cli.command {
        Command::Search(args) => search(config, args).await,
        Command::Cache { command } => cache(config, command).await,
    }
}

/// Resolve the cache path: explicit flag, then configured value, then a
/// per-user cache directory.
fn resolve_db_path(config: &AppConfig, flag: Option<PathBuf>) -> Result<PathBuf> {
    let path = if let Some(path) = flag {
        path
    } else if config.db_path != AppConfig::default().db_path {
        config.db_path.clone()
    } else {
        dirs::cache_dir()
            .map(|d| d.join("webtrail").join("cache.sqlite"))
            .unwrap_or_else(|| config.db_path.clone())
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    Ok(path)
}

fn apply_overrides(config: &mut AppConfig, args: &SearchArgs) {
    if let Some(days) = args.days {
        config.days_back = days;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(secs) = args.timeout_secs {
        config.timeout_ms = secs.saturating_mul(1000);
    }
    if let Some(max_bytes) = args.max_bytes {
        config.max_bytes = max_bytes;
    }
    if let Some(hours) = args.cache_max_age_hours {
        config.cache_max_age_hours = hours;
    }
    if let Some(context) = args.context {
        config.context_window = context;
    }
}

fn gather_sources(args: &SearchArgs) -> Vec<HistorySource> {
    if args.profile.is_empty() {
        webtrail_history::discover(&args.browser.browsers())
    } else {
        args.profile
            .iter()
            .map(|path| HistorySource {
                browser: Browser::infer_from_path(path),
                db_path: path.clone(),
            })
            .collect()
    }
}

async fn search(mut config: AppConfig, args: SearchArgs) -> Result<()> {
    apply_overrides(&mut config, &args);
    config.validate().context("invalid configuration")?;

    let query = KeywordQuery::new(&args.keywords, args.mode.into())?;

    let sources = gather_sources(&args);
    if sources.is_empty() {
        bail!("no browser history databases found; pass --profile to point at one");
    }
    tracing::info!("reading {} history database(s)", sources.len());

    let records = webtrail_history::load_all(&sources, config.days_back).await?;
    if records.is_empty() {
        bail!("no visits in the last {} days", config.days_back);
    }
    tracing::info!("{} visits in the last {} days", records.len(), config.days_back);

    let db_path = resolve_db_path(&config, args.db_path.clone())?;
    let store = PageStore::open(&db_path).await?;

    let client = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        max_redirects: 5,
    })?;
    let pool = FetchPool::new(client, store.clone(), config.concurrency, config.pacing())?;

    // Ctrl-C stops dispatching and hard-aborts in-flight fetches; the
    // run then finishes with whatever the cache already holds.
    let abort = pool.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping fetches");
            abort.abort();
        }
    });

    let opts = SearchOptions {
        cache_max_age: config.cache_max_age(),
        cache_only: args.cache_only,
        force_refresh: args.force_refresh,
        context_window: config.context_window,
        extract: ExtractConfig {
            min_length: config.min_text_length,
            max_length: config.max_text_length,
        },
    };

    let outcome = run_search(&store, &pool, &records, &query, &opts).await?;

    tracing::info!(
        attempted = outcome.summary.attempted,
        cache_hits = outcome.summary.cache_hits,
        fetched = outcome.summary.fetched,
        failed = outcome.summary.failed,
        matched = outcome.summary.matched,
        "search complete"
    );

    let rendered = if args.json {
        serde_json::to_string_pretty(&outcome.matches).context("serializing results")?
    } else {
        report::render_html(&query, &outcome)
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

async fn cache(config: AppConfig, command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Stats { db_path } => {
            let path = resolve_db_path(&config, db_path)?;
            let store = PageStore::open(&path).await?;
            let stats = store.stats().await?;

            println!("cache:       {}", path.display());
            println!("entries:     {}", stats.entry_count);
            println!("total bytes: {}", stats.total_bytes);
            println!("oldest:      {}", stats.oldest.as_deref().unwrap_or("-"));
            println!("newest:      {}", stats.newest.as_deref().unwrap_or("-"));
        }
        CacheCommand::Clean { older_than_days, db_path } => {
            if older_than_days < 0 {
                bail!("--older-than-days must not be negative");
            }
            let path = resolve_db_path(&config, db_path)?;
            let store = PageStore::open(&path).await?;
            let removed = store.clean(older_than_days).await?;
            println!("removed {removed} entries older than {older_than_days} days");
        }
    }
    Ok(())
}
