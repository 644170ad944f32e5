use crate::line_protocol::{build_line_batches, PRECISION};
use crate::point::MetricPoint;
use crate::sink::retry::{with_retry, IsRetryable, RetryConfig};
use crate::sink::sender::{PointSink, SendResult};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum body size per write request
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Errors that can occur when writing to InfluxDB
#[derive(Debug)]
pub enum SendError {
    Timeout,
    Http { status: u16, endpoint: String },
    Network(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Timeout => write!(f, "request timed out"),
            SendError::Http { status, endpoint } => {
                write!(f, "HTTP {} from {}", status, endpoint)
            }
            SendError::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

impl std::error::Error for SendError {}

impl IsRetryable for SendError {
    fn is_retryable(&self) -> bool {
        match self {
            SendError::Timeout => true,
            SendError::Http { status, .. } => matches!(status, 429 | 502..=504),
            SendError::Network(_) => true,
        }
    }
}

/// Where and as whom to write
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfluxTarget {
    pub url: String,
    pub database: String,
    pub retention_policy: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl InfluxTarget {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Full `/write` URL including query parameters. Credentials passed as
    /// `u`/`p` only when no token is configured.
    pub fn write_url(&self) -> String {
        let mut url = format!(
            "{}/write?db={}&precision={}",
            self.url.trim_end_matches('/'),
            urlencoding::encode(&self.database),
            PRECISION
        );
        if let Some(rp) = self.retention_policy.as_deref().filter(|rp| !rp.is_empty()) {
            url.push_str("&rp=");
            url.push_str(&urlencoding::encode(rp));
        }
        if self.token.is_none() {
            if let (Some(u), Some(p)) = (&self.username, &self.password) {
                url.push_str("&u=");
                url.push_str(&urlencoding::encode(u));
                url.push_str("&p=");
                url.push_str(&urlencoding::encode(p));
            }
        }
        url
    }
}

/// Line protocol writer for the InfluxDB `/write` endpoint
pub struct InfluxClient {
    client: Client,
    target: InfluxTarget,
    write_url: String,
    retry: RetryConfig,
}

impl InfluxClient {
    /// Returns an error if the HTTP client fails to build (e.g., TLS configuration issues).
    pub fn new(target: InfluxTarget, retry: RetryConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;
        let write_url = target.write_url();
        Ok(Self {
            client,
            target,
            write_url,
            retry,
        })
    }

    pub fn target(&self) -> &InfluxTarget {
        &self.target
    }

    /// Encode and write points, splitting into several requests if needed
    #[tracing::instrument(
        name = "influx_write",
        skip(self, points),
        fields(
            database = %self.target.database,
            point_count = points.len(),
        )
    )]
    async fn write_points(&self, points: &[MetricPoint]) -> Result<usize, SendError> {
        let batches = build_line_batches(points, MAX_BODY_SIZE);
        let batch_count = batches.len();

        if batch_count > 1 {
            debug!(
                batch_count,
                total_points = points.len(),
                "splitting into multiple batches due to size limit"
            );
        }

        let mut sent_count = 0;
        for (batch_idx, body) in batches.into_iter().enumerate() {
            debug!(batch_idx, batch_size = body.len(), batch_count, "sending batch chunk");
            sent_count += self.write_single_batch(body).await?;
        }

        debug!(sent_count, "all batches written");
        Ok(sent_count)
    }

    async fn write_single_batch(&self, body: Bytes) -> Result<usize, SendError> {
        let line_count = body.iter().filter(|&&b| b == b'\n').count() + 1;
        let endpoint = self.target.url.as_str();

        with_retry(&self.retry, || async {
            let mut request = self
                .client
                .post(&self.write_url)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(body.clone());
            if let Some(token) = &self.target.token {
                request = request.header("Authorization", format!("Token {}", token));
            }

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout
                } else {
                    SendError::Network(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let resp_body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "(failed to read body)".to_string());
                error!(
                    endpoint,
                    status,
                    response_body = %resp_body,
                    "influx returned error status"
                );
                return Err(SendError::Http {
                    status,
                    endpoint: endpoint.to_string(),
                });
            }

            Ok(line_count)
        })
        .await
    }
}

#[async_trait::async_trait]
impl PointSink for InfluxClient {
    async fn send_points(&self, points: Vec<MetricPoint>) -> SendResult {
        let mut result = SendResult::default();
        if points.is_empty() {
            return result;
        }
        match self.write_points(&points).await {
            Ok(count) => result.sent = count,
            Err(e) => result.failed.push(e.to_string()),
        }
        result
    }
}
