//! Remote source for master data tables.
//!
//! Tables are served as `GET {endpoint}?sheet={table}`; the body is the raw
//! serialized envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Fetches the serialized envelope for one table.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(&self, table: Table) -> Result<String, FetchError>;
}

/// Retry behavior for transient fetch failures.
///
/// The default performs no retries. Backoff doubles after every failed
/// attempt and is capped at `max_backoff_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before retry number `attempt` (starting at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// reqwest-backed fetcher for the master data endpoint.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, table: Table) -> Result<String, FetchError> {
        tracing::debug!("GET {}?sheet={}", self.endpoint, table);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("sheet", table.name())])
            .send()
            .await
            .map_err(|e| FetchError::HttpError(table, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(table, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::HttpError(table, e.to_string()))
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, table: Table) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(table).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        "Fetching {} failed ({}), retry {}/{} in {:?}",
                        table,
                        e,
                        attempt,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Errors that can occur while fetching a table.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read.
    HttpError(Table, String),
    /// Server answered with a non-success status.
    Status(Table, u16),
}

impl FetchError {
    /// Returns true for failures worth retrying: transport errors, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::HttpError(_, _) => true,
            FetchError::Status(_, code) => *code == 429 || *code >= 500,
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::HttpError(table, e) => write!(f, "Request for {} failed: {}", table, e),
            FetchError::Status(table, code) => {
                write!(f, "Server returned status {} for {}", code, table)
            }
        }
    }
}

impl std::error::Error for FetchError {}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 350,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::HttpError(Table::Card, "reset".into()).is_transient());
        assert!(FetchError::Status(Table::Card, 503).is_transient());
        assert!(FetchError::Status(Table::Card, 429).is_transient());
        assert!(!FetchError::Status(Table::Card, 404).is_transient());
    }

    #[tokio::test]
    async fn test_fetch_sends_sheet_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::UrlEncoded("sheet".into(), "JP_Text".into()))
            .with_status(200)
            .with_body(r#"{"version":1,"data":[]}"#)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(format!("{}/exec", server.url()));
        let body = fetcher.fetch(Table::JpText).await.unwrap();

        assert_eq!(body, r#"{"version":1,"data":[]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(format!("{}/exec", server.url()));
        let err = fetcher.fetch(Table::Card).await.unwrap_err();

        assert_eq!(err, FetchError::Status(Table::Card, 404));
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(format!("{}/exec", server.url())).with_retry(RetryPolicy {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        });
        let err = fetcher.fetch(Table::Item).await.unwrap_err();

        assert_eq!(err, FetchError::Status(Table::Item, 500));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_client_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/exec")
            .match_query(Matcher::Any)
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(format!("{}/exec", server.url())).with_retry(RetryPolicy {
            max_retries: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        });
        assert!(fetcher.fetch(Table::Quest).await.is_err());
        mock.assert_async().await;
    }
}
