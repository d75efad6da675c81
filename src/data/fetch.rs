//! Resilient JSON fetching.
//!
//! `ResilientFetcher` wraps a `Transport` (the blocking reqwest client in
//! production, a scripted stub in tests) with a `RetryStrategy`. Failures
//! stay inside this module: callers get `Some(json)` or `None` and carry on
//! with whatever data they already have.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::AppError;

/// Why a single attempt failed.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("undecodable response: {0}")]
    Decode(String),
}

/// One blocking GET returning JSON.
pub trait Transport: Send + Sync {
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Production transport backed by `reqwest::blocking`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fuelcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::upstream(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        resp.json::<Value>().map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// How many attempts to make and how long to wait between them.
pub trait RetryStrategy: Send + Sync {
    fn max_attempts(&self) -> u32;

    /// Pause after the failed `attempt` (1-based) before the next one.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same pause between every attempt.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    attempts: u32,
    delay: Duration,
}

impl FixedDelay {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// No waiting at all; used by tests.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }
}

impl RetryStrategy for FixedDelay {
    fn max_attempts(&self) -> u32 {
        self.attempts
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    strategy: Arc<dyn RetryStrategy>,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn Transport>, strategy: Arc<dyn RetryStrategy>) -> Self {
        Self { transport, strategy }
    }

    /// Same transport, different retry budget.
    pub fn with_strategy(&self, strategy: Arc<dyn RetryStrategy>) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            strategy,
        }
    }

    /// GET `url` as JSON, retrying on any failure.
    pub fn fetch(&self, url: &str) -> Option<Value> {
        self.fetch_parsed(url, |json| Ok(json.clone()))
    }

    /// GET `url` and parse it; a parse failure counts as a failed attempt.
    pub fn fetch_parsed<T>(&self, url: &str, parse: impl Fn(&Value) -> Result<T, String>) -> Option<T> {
        let max = self.strategy.max_attempts();
        for attempt in 1..=max {
            let failure = match self.transport.get_json(url) {
                Ok(json) => match parse(&json) {
                    Ok(value) => return Some(value),
                    Err(e) => FetchError::Decode(e).to_string(),
                },
                Err(e) => e.to_string(),
            };

            if attempt < max {
                let delay = self.strategy.delay(attempt);
                warn!(
                    url,
                    attempt,
                    max_attempts = max,
                    delay_secs = delay.as_secs_f64(),
                    "Fetch failed ({failure}); retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            } else {
                error!(url, attempts = max, "Fetch failed ({failure}); giving up");
            }
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::*;
    use super::*;

    #[test]
    fn returns_json_after_transient_failures() {
        let transport = Arc::new(ScriptedTransport::new().route(
            "/series",
            vec![server_error("/series"), server_error("/series"), Ok(json!([1, 2]))],
        ));
        let fetcher = fetcher(Arc::clone(&transport), 5);

        let body = fetcher.fetch("https://example.test/series").unwrap();

        assert_eq!(body, json!([1, 2]));
        assert_eq!(transport.calls().len(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let transport = Arc::new(ScriptedTransport::new().route("/down", vec![server_error("/down")]));
        let fetcher = fetcher(Arc::clone(&transport), 4);

        assert!(fetcher.fetch("https://example.test/down").is_none());
        assert_eq!(transport.calls().len(), 4);
    }

    #[test]
    fn parse_failures_are_retried() {
        let transport = Arc::new(
            ScriptedTransport::new().route("/q", vec![Ok(json!({"nope": 1})), Ok(json!({"value": 7}))]),
        );
        let fetcher = fetcher(Arc::clone(&transport), 3);

        let v = fetcher.fetch_parsed("https://example.test/q", |json| {
            json.get("value")
                .and_then(Value::as_i64)
                .ok_or_else(|| "missing value".to_string())
        });

        assert_eq!(v, Some(7));
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn fixed_delay_never_allows_zero_attempts() {
        let strategy = FixedDelay::new(0, Duration::from_secs(60));
        assert_eq!(strategy.max_attempts(), 1);
        assert_eq!(strategy.delay(1), Duration::from_secs(60));
    }
}
