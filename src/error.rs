use std::fmt;

/// Error from a single reputation lookup.
///
/// None of these abort a batch: the checker downgrades every one of them to
/// an `unknown` record once retries are exhausted.
#[derive(Debug)]
pub enum LookupError {
    /// Transport-level failure (connect, TLS, body read)
    Network(reqwest::Error),
    /// Request exceeded the configured timeout
    Timeout,
    /// HTTP 429 from the service
    RateLimited,
    /// Non-success HTTP status other than 429 / 401 / 403
    HttpStatus(u16),
    /// Service refused the query (bad key, exhausted quota)
    Denied(String),
    /// Body was not the JSON we expect
    InvalidResponse(String),
}

impl LookupError {
    /// Whether another attempt has a chance of succeeding.
    pub fn is_retriable(&self) -> bool {
        match self {
            LookupError::Network(_) | LookupError::Timeout | LookupError::RateLimited => true,
            LookupError::HttpStatus(code) => (500..600).contains(code),
            LookupError::Denied(_) | LookupError::InvalidResponse(_) => false,
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Network(err) => write!(f, "Network error: {}", err),
            LookupError::Timeout => write!(f, "Request timed out"),
            LookupError::RateLimited => write!(f, "Rate limited (HTTP 429)"),
            LookupError::HttpStatus(code) => write!(f, "HTTP error: status {}", code),
            LookupError::Denied(msg) => write!(f, "Denied by service: {}", msg),
            LookupError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else if err.is_decode() {
            LookupError::InvalidResponse(err.to_string())
        } else {
            LookupError::Network(err)
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::InvalidResponse(err.to_string())
    }
}
