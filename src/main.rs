//! Tally-Trawl main entry point
//!
//! This is the command-line interface for the Tally-Trawl election-results
//! crawler. While a crawl runs, operator commands are read from stdin and a
//! stats feed is published at a fixed interval.

use anyhow::Context;
use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_trawl::config::{load_config_with_hash, Config};
use tally_trawl::output::{format_statistics, write_results_json};
use tally_trawl::Crawler;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Tally-Trawl: a polite election-results crawler
///
/// Tally-Trawl walks an election site's results tables, downloads the
/// result PDFs they link to into per-year directories, and reports live
/// progress and the discovered link graph.
#[derive(Parser, Debug)]
#[command(name = "tally-trawl")]
#[command(version)]
#[command(about = "A polite election-results crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Print the stats snapshot as a JSON line on every feed tick
    #[arg(long, conflicts_with = "dry_run")]
    feed: bool,

    /// Interval between stats feed ticks
    #[arg(long, value_name = "MILLIS", default_value_t = 1000)]
    feed_interval_ms: u64,
}

/// A line typed on the operator console
#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Pause,
    Resume,
    Stop,
    Rate(f64),
    Stats,
    Help,
}

impl ConsoleCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();

        let parsed = match command.as_str() {
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "stop" => Self::Stop,
            "stats" => Self::Stats,
            "help" | "?" => Self::Help,
            "rate" => {
                let value = words
                    .next()
                    .ok_or_else(|| "usage: rate <seconds>".to_string())?;
                let seconds = value
                    .parse::<f64>()
                    .map_err(|_| format!("not a number: {}", value))?;
                Self::Rate(seconds)
            }
            "" => return Err("empty command".to_string()),
            other => return Err(format!("unknown command: {} (try 'help')", other)),
        };

        match words.next() {
            Some(extra) => Err(format!("unexpected argument: {}", extra)),
            None => Ok(parsed),
        }
    }
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

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tally_trawl=info,warn"),
            1 => EnvFilter::new("tally_trawl=debug,info"),
            2 => EnvFilter::new("tally_trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so `--feed` output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Tally-Trawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Rate limit: {}s", config.crawler.rate_limit_seconds);
    println!(
        "  Request timeout: {}s",
        config.crawler.request_timeout_seconds
    );
    println!("  Pause poll: {}ms", config.crawler.pause_poll_millis);

    let classifier = &config.classifier;
    println!("\nClassifier:");
    println!("  Results table: {}", classifier.results_selector);
    println!(
        "  PDF links: *{} containing one of {:?}",
        classifier.pdf_extension, classifier.pdf_keywords
    );
    println!(
        "  Page links: {:?} containing one of {:?}",
        classifier.page_extensions, classifier.page_keywords
    );
    println!("  Same host only: {}", classifier.same_host_only);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  PDF root: {}/<year>/<file>.pdf", config.output.pdf_root);
    match &config.output.results_path {
        Some(path) => println!("  Results: {}", path),
        None => println!("  Results: (not written)"),
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.crawler.start_url);
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let results_path = config.output.results_path.clone();
    let crawler = Crawler::from_config(config).context("Failed to initialise crawler")?;

    let run = crawler
        .start()
        .context("A crawl is already running")?;

    let feed = tokio::spawn(publish_stats(
        crawler.clone(),
        Duration::from_millis(cli.feed_interval_ms.max(1)),
        cli.feed,
    ));
    let console = tokio::spawn(run_console(crawler.clone(), spawn_stdin_reader()));
    let interrupt = {
        let crawler = crawler.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping crawl");
                crawler.stop();
            }
        })
    };

    let joined = run.await;
    feed.abort();
    console.abort();
    interrupt.abort();
    joined.context("Crawl task failed")?;

    let stats = crawler.get_stats();
    if cli.feed {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        print!("{}", format_statistics(&stats));
    }

    if let Some(path) = results_path {
        write_results_json(&crawler.get_results(), Path::new(&path))
            .with_context(|| format!("Failed to write results to {}", path))?;
        tracing::info!("Results written to {}", path);
    }

    Ok(())
}

/// Publishes the stats snapshot once per `interval`
async fn publish_stats(crawler: Crawler, interval: Duration, json_lines: bool) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_update = None;

    loop {
        ticker.tick().await;
        let stats = crawler.get_stats();

        if json_lines {
            match serde_json::to_string(&stats) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize stats: {}", e),
            }
        } else if stats.updated_at != last_update {
            tracing::info!(
                "Stats: {} | {} pages crawled, {} PDFs found, {} downloaded, {} queued",
                stats.status,
                stats.pages_crawled,
                stats.pdfs_found,
                stats.pdfs_downloaded,
                stats.frontier_size
            );
        }
        last_update = stats.updated_at;
    }
}

/// Reads stdin on a dedicated thread; a blocking read must not hold up
/// runtime shutdown once the crawl is over
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Maps operator console lines onto crawler control operations
async fn run_console(crawler: Crawler, mut lines: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }

        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match command {
            ConsoleCommand::Pause => {
                if !crawler.pause() {
                    eprintln!("Crawl is not running");
                }
            }
            ConsoleCommand::Resume => {
                if !crawler.resume() {
                    eprintln!("Crawl is not paused");
                }
            }
            ConsoleCommand::Stop => {
                if !crawler.stop() {
                    eprintln!("Crawl is already stopped");
                }
            }
            ConsoleCommand::Rate(seconds) => {
                if let Err(e) = crawler.set_rate_limit(seconds) {
                    eprintln!("{}", e);
                }
            }
            ConsoleCommand::Stats => eprint!("{}", format_statistics(&crawler.get_stats())),
            ConsoleCommand::Help => {
                eprintln!("Commands: pause | resume | stop | rate <seconds> | stats | help")
            }
        }
    }
}
