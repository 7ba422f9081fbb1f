//! proxycheck.io v3 lookup client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LookupError;

pub const DEFAULT_ENDPOINT: &str = "https://proxycheck.io/v3";

/// A reputation service that can be asked about one address at a time.
///
/// Implementations return the response body as-is; turning it into an
/// `IpRecord` is the checker's job.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<Value, LookupError>;

    /// Service name for logging.
    fn name(&self) -> &str;
}

pub struct ProxyCheckClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ProxyCheckClient {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ip-check/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ProxyCheckClient {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url_for(&self, ip: &str) -> String {
        format!("{}/{}", self.endpoint, ip)
    }
}

#[async_trait]
impl ReputationLookup for ProxyCheckClient {
    async fn lookup(&self, ip: &str) -> Result<Value, LookupError> {
        let mut request = self.client.get(self.url_for(ip));
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        debug!(ip = %ip, "Querying proxycheck.io");
        let response = request.send().await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(LookupError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                return Err(LookupError::Denied(service_message(&body)));
            }
            status if !status.is_success() => return Err(LookupError::HttpStatus(status.as_u16())),
            _ => {}
        }

        let body: Value = response.json().await?;

        match body.get("status").and_then(Value::as_str) {
            Some("denied") => Err(LookupError::Denied(message_of(&body))),
            Some("error") => Err(LookupError::InvalidResponse(message_of(&body))),
            Some("warning") => {
                warn!(ip = %ip, message = %message_of(&body), "proxycheck.io returned a warning");
                Ok(body)
            }
            _ => Ok(body),
        }
    }

    fn name(&self) -> &str {
        "proxycheck.io"
    }
}

fn message_of(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string()
}

fn service_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .map(|v| message_of(&v))
        .unwrap_or_else(|_| body.trim().to_string())
}
