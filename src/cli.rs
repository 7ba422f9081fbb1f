use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ip-check")]
#[command(author = "IP Checker")]
#[command(version = "0.1.0")]
#[command(about = "Batch IP reputation checker backed by proxycheck.io", long_about = None)]
pub struct Args {
    /// TOML config file supplying defaults for checker options
    #[arg(short = 'c', long, env = "IP_CHECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long, env = "IP_CHECK_VERBOSE", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up every address in an input file and save the results as JSON
    Check(CheckArgs),
    /// Aggregate a results JSON file into CSV statistics
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// IPLogger export or plain list of addresses
    pub input: PathBuf,

    /// Results JSON file
    #[arg(default_value = "proxycheck_results.json")]
    pub output: PathBuf,

    /// proxycheck.io API key (without one the service applies a lower rate limit)
    #[arg(short = 'k', long, env = "PROXYCHECK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Lookup endpoint base URL (defaults to https://proxycheck.io/v3)
    #[arg(long, env = "PROXYCHECK_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Number of parallel workers (defaults to 3)
    #[arg(short = 'w', long, env = "MAX_WORKERS")]
    pub workers: Option<usize>,

    /// Seconds each worker waits between its requests (defaults to 1.0)
    #[arg(short = 'd', long, env = "DELAY_BETWEEN_REQUESTS")]
    pub delay: Option<f64>,

    /// Request timeout in seconds (defaults to 15)
    #[arg(short = 't', long, env = "PROXYCHECK_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Attempts per address, first try included (defaults to 3)
    #[arg(long, env = "PROXYCHECK_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Base retry wait in seconds, doubled per attempt after HTTP 429 (defaults to 2.0)
    #[arg(long, env = "PROXYCHECK_RETRY_DELAY")]
    pub retry_delay: Option<f64>,

    /// Also write CSV statistics to this path
    #[arg(short = 's', long)]
    pub stats: Option<PathBuf>,

    /// Log each lookup instead of drawing a progress bar
    #[arg(long, env = "IP_CHECK_NO_PROGRESS")]
    pub no_progress: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Results JSON written by `check`
    pub results: PathBuf,

    /// Detail CSV; summary and country files are written next to it
    #[arg(default_value = "proxycheck_stats.csv")]
    pub output: PathBuf,

    /// Number of countries shown in the logged summary
    #[arg(long, default_value = "10")]
    pub top: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let args = Args::try_parse_from([
            "ip-check", "check", "ips.csv", "out.json", "-w", "5", "--delay", "0.5", "--stats", "stats.csv",
        ])
        .unwrap();

        match args.command {
            Command::Check(check) => {
                assert_eq!(check.input, PathBuf::from("ips.csv"));
                assert_eq!(check.output, PathBuf::from("out.json"));
                assert_eq!(check.workers, Some(5));
                assert_eq!(check.delay, Some(0.5));
                assert_eq!(check.stats, Some(PathBuf::from("stats.csv")));
            }
            other => panic!("expected check, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_analyze_defaults() {
        let args = Args::try_parse_from(["ip-check", "analyze", "results.json", "-v"]).unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Analyze(analyze) => {
                assert_eq!(analyze.output, PathBuf::from("proxycheck_stats.csv"));
                assert_eq!(analyze.top, 10);
            }
            other => panic!("expected analyze, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Args::try_parse_from(["ip-check", "check"]).is_err());
    }
}
