//! Checker settings
//!
//! Values come from, in order of precedence: command-line flags or their
//! environment variables, the optional TOML config file, built-in defaults.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cli::CheckArgs;
use crate::service::{CheckerConfig, DEFAULT_ENDPOINT};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Contents of the optional TOML config file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub workers: Option<usize>,
    pub delay_secs: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_delay_secs: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    pub checker: CheckerConfig,
}

impl Settings {
    pub fn resolve(args: &CheckArgs, file: FileConfig) -> Result<Self> {
        let defaults = CheckerConfig::default();

        // an empty PROXYCHECK_API_KEY= line in .env means "no key"
        let api_key = args
            .api_key
            .clone()
            .or(file.api_key)
            .filter(|key| !key.trim().is_empty());

        let endpoint = args
            .endpoint
            .clone()
            .or(file.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        if endpoint.trim().is_empty() {
            bail!("Endpoint must not be empty");
        }

        let workers = args.workers.or(file.workers).unwrap_or(defaults.workers);
        if workers == 0 {
            bail!("Worker count must be at least 1");
        }

        let max_attempts = args.max_attempts.or(file.max_attempts).unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            bail!("Max attempts must be at least 1");
        }

        let timeout_secs = args.timeout.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("Timeout must be at least 1 second");
        }

        let delay = match args.delay.or(file.delay_secs) {
            Some(secs) => seconds("delay", secs)?,
            None => defaults.delay,
        };
        let retry_delay = match args.retry_delay.or(file.retry_delay_secs) {
            Some(secs) => seconds("retry delay", secs)?,
            None => defaults.retry_delay,
        };

        Ok(Settings {
            api_key,
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            checker: CheckerConfig {
                workers,
                delay,
                max_attempts,
                retry_delay,
            },
        })
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        bail!("Invalid {}: {} (expected a non-negative number of seconds)", name, secs);
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("Invalid {}: {} seconds is out of range", name, secs))
}

/// Load `.env` from the working directory. A missing file is not an error;
/// anything else is handed back so it can be logged once tracing is up.
pub fn load_dotenv() -> Option<dotenvy::Error> {
    dotenv_error(dotenvy::dotenv())
}

fn dotenv_error<T>(result: std::result::Result<T, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(e) if !e.not_found() => Some(e),
        _ => None,
    }
}
