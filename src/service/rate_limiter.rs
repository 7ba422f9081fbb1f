use std::time::{Duration, Instant};

/// Per-worker request pacer.
///
/// Each worker owns one; it guarantees at least `delay` between the starts of
/// that worker's successive requests. There is no shared state between
/// pacers, so N workers issue at most N requests per `delay`.
pub struct RequestPacer {
    delay: Duration,
    last_request: Option<Instant>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        RequestPacer {
            delay,
            last_request: None,
        }
    }

    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}
