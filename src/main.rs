mod cli;
mod config;
mod dao;
mod error;
mod metrics;
mod model;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn, Level};

use cli::{AnalyzeArgs, Args, CheckArgs, Command};
use config::{FileConfig, Settings};
use dao::{load_ips, write_reports, ResultsFile};
use service::{aggregate, BatchChecker, ProxyCheckClient};

const TOP_COUNTRIES: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real environment variables take precedence
    let dotenv_error = config::load_dotenv();

    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    if let Some(e) = dotenv_error {
        warn!("Failed to load .env file: {}", e);
    }

    match args.command {
        Command::Check(check) => run_check(check, args.config).await,
        Command::Analyze(analyze) => run_analyze(analyze),
    }
}

async fn run_check(check: CheckArgs, config_path: Option<PathBuf>) -> Result<()> {
    let file_config = match &config_path {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&check, file_config)?;

    info!("IP reputation check starting");
    info!(
        "Config: input={}, output={}, workers={}, delay={:.2}s, attempts={}, timeout={}s, endpoint={}",
        check.input.display(),
        check.output.display(),
        settings.checker.workers,
        settings.checker.delay.as_secs_f64(),
        settings.checker.max_attempts,
        settings.timeout.as_secs(),
        settings.endpoint
    );
    if settings.api_key.is_none() {
        warn!("No API key configured, proxycheck.io will apply its lower anonymous rate limit");
    }

    // Only unreadable or empty input is fatal; everything after this degrades per IP
    let ips = load_ips(&check.input)?;
    let total = ips.len();

    let client = ProxyCheckClient::new(&settings.endpoint, settings.api_key.clone(), settings.timeout)
        .context("Failed to build HTTP client")?;
    let api_key_used = client.has_api_key();
    let checker = BatchChecker::new(Arc::new(client), settings.checker.clone());

    let stop = checker.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight lookups and saving partial results (Ctrl-C again to abort)");
            stop.store(false, Ordering::SeqCst);
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt received, aborting without saving");
                std::process::exit(130);
            }
        }
    });

    let progress = if check.no_progress {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        bar
    };

    let metrics = checker.get_metrics().clone();
    let records = checker
        .run(ips, |record| {
            if progress.is_hidden() {
                let status = if record.is_resolved() { "[OK]" } else { "[NG]" };
                info!(
                    "{} {} {} risk={} ({} OK, {} NG)",
                    status,
                    record.ip,
                    record.detection,
                    record.risk,
                    metrics.get_succeeded(),
                    metrics.get_failed()
                );
            } else {
                progress.set_message(format!("OK {} NG {} | {}", metrics.get_succeeded(), metrics.get_failed(), record.ip));
                progress.inc(1);
            }
        })
        .await;
    progress.finish_and_clear();

    metrics.print_summary();

    let results = ResultsFile::new(&check.input, total, &records, api_key_used);
    results.save(&check.output)?;
    if results.metadata.interrupted {
        warn!(
            checked = records.len(),
            total = total,
            "Run was interrupted; results file holds partial results"
        );
    }
    info!(
        "Total IPs: {}, successful: {}, failed: {}",
        results.metadata.total_ips, results.metadata.successful, results.metadata.failed
    );

    let summary = aggregate(&records);
    summary.log(TOP_COUNTRIES);

    match &check.stats {
        Some(stats) => {
            let paths = write_reports(stats, &records, &summary)?;
            info!(
                "Reports written: {}, {}, {}",
                paths.details.display(),
                paths.summary.display(),
                paths.countries.display()
            );
        }
        None => info!("Next step: ip-check analyze {}", check.output.display()),
    }

    Ok(())
}

fn run_analyze(analyze: AnalyzeArgs) -> Result<()> {
    let results = ResultsFile::load(&analyze.results)?;
    if results.metadata.interrupted {
        warn!(
            source = %results.metadata.source_file,
            "Results come from an interrupted run; statistics cover checked addresses only"
        );
    }

    let records = results.records();
    let summary = aggregate(&records);
    summary.log(analyze.top);

    if summary.resolved_count() == 0 {
        warn!("No resolved records; the detail CSV will be empty");
    }

    let paths = write_reports(&analyze.output, &records, &summary)?;
    info!(
        "Reports written: {}, {}, {}",
        paths.details.display(),
        paths.summary.display(),
        paths.countries.display()
    );
    Ok(())
}
