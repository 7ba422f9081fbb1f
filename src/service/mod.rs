pub mod aggregator;
pub mod checker;
pub mod proxycheck;
mod rate_limiter;

pub use aggregator::aggregate;
pub use checker::{BatchChecker, CheckerConfig};
pub use proxycheck::{ProxyCheckClient, DEFAULT_ENDPOINT};
