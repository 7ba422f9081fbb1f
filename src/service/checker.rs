//! Batch checker
//!
//! Fans a list of addresses out to a fixed pool of workers. Each worker pulls
//! the next address from a shared queue, paces its own requests, retries
//! transient failures and reports one `IpRecord` per address. A failed lookup
//! becomes an `unknown` record; nothing a single address does can stop the
//! batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::LookupError;
use crate::metrics::CheckMetrics;
use crate::model::IpRecord;
use crate::service::proxycheck::ReputationLookup;
use crate::service::rate_limiter::RequestPacer;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    pub workers: usize,
    /// Minimum spacing between one worker's successive requests
    pub delay: Duration,
    /// Total attempts per address, first try included
    pub max_attempts: u32,
    /// Base wait before a retry; doubled per attempt after a 429
    pub retry_delay: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            workers: 3,
            delay: Duration::from_secs(1),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Clone)]
pub struct BatchChecker {
    lookup: Arc<dyn ReputationLookup>,
    config: CheckerConfig,
    metrics: CheckMetrics,
    running: Arc<AtomicBool>,
}

impl BatchChecker {
    pub fn new(lookup: Arc<dyn ReputationLookup>, config: CheckerConfig) -> Self {
        BatchChecker {
            lookup,
            config,
            metrics: CheckMetrics::new(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that stops workers from taking further addresses when cleared.
    /// A lookup in flight is not retried once the flag is cleared; it is
    /// reported with whatever outcome its current attempt produced.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn get_metrics(&self) -> &CheckMetrics {
        &self.metrics
    }

    /// Check every address and return the records collected.
    ///
    /// `progress` is called once per completed lookup. If the stop flag is
    /// cleared mid-run the returned vector holds only the addresses that were
    /// processed.
    pub async fn run(&self, ips: Vec<String>, progress: impl Fn(&IpRecord)) -> Vec<IpRecord> {
        let total = ips.len();
        let (queue_tx, queue_rx) = mpsc::channel(total.max(1));
        for ip in ips {
            // capacity covers every address, so this never waits
            if queue_tx.send(ip).await.is_err() {
                break;
            }
        }
        drop(queue_tx);

        let queue = Arc::new(Mutex::new(queue_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<IpRecord>(self.config.workers.max(1) * 2);

        let mut join_set = JoinSet::new();
        for worker_id in 0..self.config.workers.max(1) {
            let checker = self.clone();
            let queue = queue.clone();
            let result_tx = result_tx.clone();
            join_set.spawn(async move {
                checker.worker_loop(worker_id, queue, result_tx).await;
            });
        }
        drop(result_tx);

        let mut records = Vec::with_capacity(total);
        while let Some(record) = result_rx.recv().await {
            progress(&record);
            records.push(record);
        }

        while let Some(res) = join_set.join_next().await {
            if let Err(e) = res {
                error!("Worker task join error: {}", e);
            }
        }

        if records.len() < total {
            warn!(checked = records.len(), total = total, "Batch stopped before all addresses were checked");
        }
        records
    }

    async fn worker_loop(
        &self,
        worker_id: usize,
        queue: Arc<Mutex<mpsc::Receiver<String>>>,
        results: mpsc::Sender<IpRecord>,
    ) {
        let mut pacer = RequestPacer::new(self.config.delay);

        loop {
            if self.stop_requested() {
                debug!(worker = worker_id, "Stop requested, worker exiting");
                break;
            }

            // lock is only held while taking the next address
            let next = queue.lock().await.recv().await;
            let Some(ip) = next else { break };

            let record = self.check_ip(&ip, &mut pacer).await;
            if results.send(record).await.is_err() {
                break;
            }
        }
    }

    /// Look up one address with retries; always yields a record.
    pub async fn check_ip(&self, ip: &str, pacer: &mut RequestPacer) -> IpRecord {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            pacer.acquire().await;

            let error = match self.lookup.lookup(ip).await {
                Ok(body) => match IpRecord::from_response(ip, body) {
                    Ok(record) => {
                        self.metrics.record_success();
                        debug!(ip = %ip, detection = %record.detection, risk = record.risk, "Lookup complete");
                        return record;
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if matches!(error, LookupError::RateLimited) {
                self.metrics.increment_rate_limited();
            }

            if !error.is_retriable() || attempt + 1 >= max_attempts {
                warn!(ip = %ip, attempt = attempt + 1, service = self.lookup.name(), error = %error, "Lookup failed, recording as unknown");
                return self.give_up(ip, &error);
            }
            if self.stop_requested() {
                info!(ip = %ip, error = %error, "Stop requested, not retrying");
                return self.give_up(ip, &error);
            }

            let wait = self.backoff(&error, attempt);
            self.metrics.increment_retries();
            if matches!(error, LookupError::RateLimited) {
                info!(ip = %ip, wait_secs = wait.as_secs_f64(), "Rate limited, backing off");
            } else {
                debug!(ip = %ip, attempt = attempt + 1, error = %error, "Retrying lookup");
            }
            tokio::time::sleep(wait).await;
            if self.stop_requested() {
                info!(ip = %ip, error = %error, "Stop requested during backoff, not retrying");
                return self.give_up(ip, &error);
            }
            attempt += 1;
        }
    }

    fn stop_requested(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    fn give_up(&self, ip: &str, error: &LookupError) -> IpRecord {
        self.metrics.record_failure();
        IpRecord::unknown(ip, error)
    }

    fn backoff(&self, error: &LookupError, attempt: u32) -> Duration {
        match error {
            LookupError::RateLimited => self.config.retry_delay.saturating_mul(2u32.saturating_pow(attempt)),
            _ => self.config.retry_delay,
        }
    }
}
