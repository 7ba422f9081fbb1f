use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Progress counters shared by all checker workers.
#[derive(Clone)]
pub struct CheckMetrics {
    total_checked: Arc<AtomicU64>,
    total_succeeded: Arc<AtomicU64>,
    total_failed: Arc<AtomicU64>,
    total_retries: Arc<AtomicU64>,
    total_rate_limited: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl CheckMetrics {
    pub fn new() -> Self {
        CheckMetrics {
            total_checked: Arc::new(AtomicU64::new(0)),
            total_succeeded: Arc::new(AtomicU64::new(0)),
            total_failed: Arc::new(AtomicU64::new(0)),
            total_retries: Arc::new(AtomicU64::new(0)),
            total_rate_limited: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn record_success(&self) {
        self.total_checked.fetch_add(1, Ordering::Relaxed);
        self.total_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_checked.fetch_add(1, Ordering::Relaxed);
        self.total_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retries(&self) {
        self.total_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limited(&self) {
        self.total_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_checked(&self) -> u64 {
        self.total_checked.load(Ordering::Relaxed)
    }

    pub fn get_succeeded(&self) -> u64 {
        self.total_succeeded.load(Ordering::Relaxed)
    }

    pub fn get_failed(&self) -> u64 {
        self.total_failed.load(Ordering::Relaxed)
    }

    pub fn get_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn get_rate_limited(&self) -> u64 {
        self.total_rate_limited.load(Ordering::Relaxed)
    }

    pub fn get_check_rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_checked() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_success_rate(&self) -> f64 {
        let checked = self.get_checked();
        if checked > 0 {
            self.get_succeeded() as f64 / checked as f64 * 100.0
        } else {
            100.0
        }
    }

    pub fn print_summary(&self) {
        tracing::info!("=== Check Metrics Summary ===");
        tracing::info!("  Total checked: {}", self.get_checked());
        tracing::info!("  Succeeded: {}", self.get_succeeded());
        tracing::info!("  Failed: {}", self.get_failed());
        tracing::info!("  Retries: {}", self.get_retries());
        tracing::info!("  Rate limited responses: {}", self.get_rate_limited());
        tracing::info!("  Check rate: {:.2} IPs/sec", self.get_check_rate());
        tracing::info!("  Success rate: {:.2}%", self.get_success_rate());
        tracing::info!("  Elapsed time: {:.2}s", self.start_time.elapsed().as_secs_f64());
    }
}

impl Default for CheckMetrics {
    fn default() -> Self {
        Self::new()
    }
}
