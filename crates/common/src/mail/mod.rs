//! Outbound mail abstraction
//!
//! Provides a single "deliver message to address" capability with:
//! - Log delivery (development default)
//! - In-memory outbox (tests, local tooling)
//! - HTTP mail API delivery with retry

use crate::config::MailConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Trait for mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()>;
}

/// A delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Writes every message to the log instead of delivering it
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(to = address, subject = subject, body = body, "Mail message");
        Ok(())
    }
}

/// Keeps messages in memory; optionally refuses every delivery
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingMail>>,
    failing: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails
    pub fn failing() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().await.clone()
    }

    /// Most recent message to `address`
    pub async fn last_to(&self, address: &str) -> Option<OutgoingMail> {
        self.outbox
            .lock()
            .await
            .iter()
            .rev()
            .find(|mail| mail.to == address)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        if self.failing {
            return Err(AppError::Mail {
                message: format!("delivery to {} refused", address),
            });
        }

        self.outbox.lock().await.push(OutgoingMail {
            to: address.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct MailApiRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Delivers through a JSON mail API
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from_address: String,
    max_retry: Duration,
}

impl HttpMailer {
    pub fn new(config: &MailConfig, api_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_url,
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
            max_retry: Duration::from_secs(config.max_retry_secs),
        })
    }

    /// One delivery attempt. Client errors other than 408 and 429 will not
    /// succeed on retry and are reported as permanent.
    async fn post(
        &self,
        request: &MailApiRequest<'_>,
    ) -> std::result::Result<(), backoff::Error<AppError>> {
        let mut builder = self.client.post(&self.api_url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            backoff::Error::transient(AppError::Mail {
                message: format!("Request failed: {}", e),
            })
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let err = AppError::Mail {
            message: format!("API error {}: {}", status, body),
        };
        let retryable = status.is_server_error()
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS;

        if retryable {
            Err(backoff::Error::transient(err))
        } else {
            Err(backoff::Error::permanent(err))
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        let request = MailApiRequest {
            from: &self.from_address,
            to: address,
            subject,
            text: body,
        };

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..ExponentialBackoff::default()
        };

        retry(policy, || async {
            self.post(&request).await.inspect_err(|e| {
                if let backoff::Error::Transient { err, .. } = e {
                    tracing::warn!(to = address, error = %err, "Mail delivery failed, retrying");
                }
            })
        })
        .await
    }
}

/// Create a mailer based on configuration
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider.as_str() {
        "http" => {
            let api_url = config.api_url.clone().ok_or_else(|| AppError::Configuration {
                message: "mail.api_url is required for the http provider".to_string(),
            })?;
            Ok(Arc::new(HttpMailer::new(config, api_url)?))
        }
        "memory" => Ok(Arc::new(MemoryMailer::new())),
        "log" => Ok(Arc::new(LogMailer)),
        other => {
            tracing::warn!(provider = other, "Unknown mail provider, using log");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_memory_outbox() {
        let mailer = MemoryMailer::new();
        mailer.send("a@example.com", "Hi", "first").await.unwrap();
        mailer.send("a@example.com", "Hi", "second").await.unwrap();

        assert_eq!(mailer.sent().await.len(), 2);
        assert_eq!(mailer.last_to("a@example.com").await.unwrap().body, "second");
        assert!(mailer.last_to("b@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_failing_mailer() {
        let mailer = MemoryMailer::failing();
        let err = mailer.send("a@example.com", "Hi", "body").await.unwrap_err();
        assert!(matches!(err, AppError::Mail { .. }));
        assert!(mailer.sent().await.is_empty());
    }

    /// A mail API on a local port that answers every request with
    /// `status`, or never answers when `status` is `None`. Returns its URL
    /// and the number of requests it has received.
    async fn mail_api(status: Option<u16>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    match status {
                        Some(code) => {
                            let reply = format!(
                                "HTTP/1.1 {code} Test\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                            );
                            let _ = socket.write_all(reply.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                });
            }
        });

        (url, hits)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn http_mailer(url: String) -> HttpMailer {
        let config = MailConfig {
            provider: "http".into(),
            timeout_secs: 1,
            max_retry_secs: 1,
            ..MailConfig::default()
        };
        HttpMailer::new(&config, url).unwrap()
    }

    #[tokio::test]
    async fn test_http_mailer_delivers() {
        let (url, hits) = mail_api(Some(202)).await;
        assert_ok!(http_mailer(url).send("a@example.com", "Hi", "body").await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_mailer_gives_up_on_rejection() {
        let (url, hits) = mail_api(Some(400)).await;
        let err = http_mailer(url).send("a@example.com", "Hi", "body").await.unwrap_err();
        assert!(matches!(err, AppError::Mail { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_mailer_retries_server_errors() {
        let (url, hits) = mail_api(Some(503)).await;
        let err = http_mailer(url).send("a@example.com", "Hi", "body").await.unwrap_err();
        assert!(matches!(err, AppError::Mail { .. }));
        assert!(hits.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_http_mailer_stalled_api_stays_within_budget() {
        let (url, _hits) = mail_api(None).await;
        let mailer = http_mailer(url);

        let started = Instant::now();
        let err = mailer.send("a@example.com", "Hi", "body").await.unwrap_err();
        assert!(matches!(err, AppError::Mail { .. }));
        // timeout_secs + max_retry_secs, plus scheduling slack
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_http_provider_requires_url() {
        let config = MailConfig {
            provider: "http".into(),
            ..MailConfig::default()
        };
        assert!(create_mailer(&config).is_err());
    }
}
