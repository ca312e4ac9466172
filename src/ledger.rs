//! Pull-only client for the external ledger of labeled rows.

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::types::Record;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of newly labeled rows. Rows are never marked consumed, so a
/// repeated fetch may return rows already merged.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Record>, LedgerError>;
}

/// Ledger reached over HTTP with a bearer token.
///
/// A 401 or 403 answer is fatal and is not retried. Other failures are
/// retried up to `retries` times.
#[derive(Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    url: String,
    token: String,
    timeout: Duration,
    retries: u32,
}

impl HttpLedger {
    /// Build a client, reading the token from the configured environment
    /// variable. A missing or empty token is fatal.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LedgerError::MissingCredentials(config.token_env.clone()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            token,
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch_once(&self) -> Result<Vec<Record>, LedgerError> {
        let request = async {
            let response = self
                .client
                .get(&self.url)
                .bearer_auth(&self.token)
                .send()
                .await?;
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(LedgerError::Rejected(status.as_u16()));
            }
            let response = response.error_for_status()?;
            let body: Value = response.json().await?;
            rows_from_json(body)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| LedgerError::Timeout(self.timeout))?
    }
}

impl fmt::Debug for HttpLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpLedger")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn fetch_rows(&self) -> Result<Vec<Record>, LedgerError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(rows) => {
                    debug!(rows = rows.len(), attempt, "Ledger rows fetched");
                    return Ok(rows);
                }
                Err(e) if !e.is_fatal() && attempt < self.retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Ledger fetch failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Ledger used when fetching is disabled: always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLedger;

#[async_trait]
impl Ledger for OfflineLedger {
    async fn fetch_rows(&self) -> Result<Vec<Record>, LedgerError> {
        Ok(Vec::new())
    }
}

/// The ledger a run should pull from: HTTP when enabled, offline otherwise.
pub fn from_config(config: &LedgerConfig) -> Result<Box<dyn Ledger>, LedgerError> {
    if config.enabled {
        Ok(Box::new(HttpLedger::from_config(config)?))
    } else {
        debug!("Ledger disabled, merging nothing");
        Ok(Box::new(OfflineLedger))
    }
}

/// Convert a JSON array of row objects into records, rendering every value
/// as cell text.
pub fn rows_from_json(body: Value) -> Result<Vec<Record>, LedgerError> {
    let Value::Array(items) = body else {
        return Err(LedgerError::Payload("expected a JSON array of rows".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(fields) => Ok(fields
                .into_iter()
                .map(|(key, value)| (key, cell_text(value)))
                .collect()),
            other => Err(LedgerError::Payload(format!(
                "row {i} is not an object: {other}"
            ))),
        })
        .collect()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn direct() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn config(token_env: &str, url: String) -> LedgerConfig {
        LedgerConfig {
            enabled: true,
            url,
            token_env: token_env.to_string(),
            timeout_secs: 10,
            retries: 1,
        }
    }

    #[test]
    fn test_rows_from_json_renders_cells() {
        let rows = rows_from_json(json!([
            {"amount (INR)": 1200.5, "is_weekend": 1, "device_type": "Web", "note": null, "flag": true}
        ]))
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["amount (INR)"], "1200.5");
        assert_eq!(rows[0]["is_weekend"], "1");
        assert_eq!(rows[0]["device_type"], "Web");
        assert_eq!(rows[0]["note"], "");
        assert_eq!(rows[0]["flag"], "true");
    }

    #[test]
    fn test_rows_from_json_rejects_non_rows() {
        assert!(matches!(
            rows_from_json(json!({"rows": []})),
            Err(LedgerError::Payload(_))
        ));
        assert!(matches!(
            rows_from_json(json!([1, 2])),
            Err(LedgerError::Payload(_))
        ));
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let err = HttpLedger::from_config(&config(
            "FRAUD_PIPELINE_TEST_TOKEN_THAT_IS_NEVER_SET",
            "http://127.0.0.1:1".to_string(),
        ))
        .unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, LedgerError::MissingCredentials(name) if name.ends_with("NEVER_SET")));
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_recoverable() {
        std::env::set_var("FRAUD_PIPELINE_TEST_TOKEN_UNREACHABLE", "secret");
        let ledger = HttpLedger::from_config(&config(
            "FRAUD_PIPELINE_TEST_TOKEN_UNREACHABLE",
            "http://127.0.0.1:1/rows".to_string(),
        ))
        .unwrap()
        .with_client(direct());

        let err = ledger.fetch_rows().await.unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_silent_ledger_times_out() {
        std::env::set_var("FRAUD_PIPELINE_TEST_TOKEN_SILENT", "secret");
        // accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/rows", listener.local_addr().unwrap());
        let ledger = HttpLedger::from_config(&config("FRAUD_PIPELINE_TEST_TOKEN_SILENT", url))
            .unwrap()
            .with_client(direct())
            .with_timeout(Duration::from_millis(200));

        let err = ledger.fetch_rows().await.unwrap_err();
        assert!(matches!(err, LedgerError::Timeout(_)));
        drop(listener);
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        std::env::set_var("FRAUD_PIPELINE_TEST_TOKEN_SERVED", "s3cret");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/rows", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let body = r#"[{"device_type":"iOS","fraud_flag":0}]"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request
        });

        let ledger = HttpLedger::from_config(&config("FRAUD_PIPELINE_TEST_TOKEN_SERVED", url))
            .unwrap()
            .with_client(direct());
        let rows = ledger.fetch_rows().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["fraud_flag"], "0");
        assert!(request.to_lowercase().contains("authorization: bearer s3cret"));
    }

    #[tokio::test]
    async fn test_rejected_token_is_fatal_without_retry() {
        std::env::set_var("FRAUD_PIPELINE_TEST_TOKEN_REJECTED", "expired");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/rows", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let mut served = 0;
            // a retry would arrive well inside this window
            while let Ok(Ok((mut socket, _))) =
                tokio::time::timeout(Duration::from_millis(500), listener.accept()).await
            {
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
                socket.write_all(response.as_bytes()).await.unwrap();
                served += 1;
            }
            served
        });

        let ledger = HttpLedger::from_config(&config("FRAUD_PIPELINE_TEST_TOKEN_REJECTED", url))
            .unwrap()
            .with_client(direct());
        let err = ledger.fetch_rows().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, LedgerError::Rejected(401)));
        assert_eq!(server.await.unwrap(), 1);
    }

    #[test]
    fn test_debug_hides_token() {
        std::env::set_var("FRAUD_PIPELINE_TEST_TOKEN_DEBUG", "hunter2-secret");
        let ledger = HttpLedger::from_config(&config(
            "FRAUD_PIPELINE_TEST_TOKEN_DEBUG",
            "http://ledger.internal/rows".to_string(),
        ))
        .unwrap();

        let rendered = format!("{ledger:?}");
        assert!(!rendered.contains("hunter2-secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("http://ledger.internal/rows"));
    }

    #[tokio::test]
    async fn test_offline_ledger_is_empty() {
        assert!(OfflineLedger.fetch_rows().await.unwrap().is_empty());
    }
}
