use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::time::timeout;

use crate::{
    config::{NormalizedConfig, RetryConfig},
    Region, RegionPingError, Result, GLOBAL_REGION_KEY,
};

/// Outcome of one delivered probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSample {
    pub latency_ms: u64,
    /// Trimmed response body, only read for the routing-façade region.
    pub routed_to: Option<String>,
}

/// Issues one timed probe against a region.
///
/// Implementations must not record anything on the region themselves; the
/// caller owns the region state and applies the sample.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn probe(&self, region: &Region) -> Result<ProbeSample>;
}

/// `GET`s the region's probe URL and times it up to the response headers.
///
/// Any HTTP response counts as delivered, whatever its status: only delivery
/// matters for timing. The body is read only for the global region, after the
/// clock has stopped.
pub struct HttpProber {
    timeout_duration: Duration,
    retry: RetryConfig,
    global_region_key: String,
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout_duration: Duration, retry: RetryConfig) -> Self {
        Self {
            timeout_duration,
            retry,
            global_region_key: GLOBAL_REGION_KEY.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &NormalizedConfig) -> Self {
        Self::new(config.settings.probe_timeout, config.retry.clone())
            .with_global_region_key(config.global_region_key.clone())
    }

    pub fn with_global_region_key(mut self, key: impl Into<String>) -> Self {
        self.global_region_key = key.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn attempt(&self, region: &Region) -> Result<ProbeSample> {
        let start = Instant::now();

        let response = timeout(
            self.timeout_duration,
            self.client
                .get(region.probe_url.clone())
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send(),
        )
        .await;

        let response = match response {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(RegionPingError::Network(e)),
            Err(_) => {
                return Err(RegionPingError::Timeout {
                    duration_ms: self.timeout_duration.as_millis() as u64,
                })
            }
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        if !response.status().is_success() {
            tracing::debug!(
                region = %region.key,
                status = %response.status(),
                "probe delivered with non-success status"
            );
        }

        let routed_to = if region.key == self.global_region_key {
            match timeout(self.timeout_duration, response.text()).await {
                Ok(Ok(body)) => Some(body.trim().to_string()).filter(|s| !s.is_empty()),
                _ => None,
            }
        } else {
            None
        };

        Ok(ProbeSample { latency_ms, routed_to })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=self.retry.retry_delay.as_millis() as u64 / 4);
        self.retry.retry_delay * attempt + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl ProbeTransport for HttpProber {
    async fn probe(&self, region: &Region) -> Result<ProbeSample> {
        let mut last_error = None;

        for attempt in 0..self.retry.retry_count {
            match self.attempt(region).await {
                Ok(sample) => return Ok(sample),
                Err(e) => {
                    tracing::debug!(
                        region = %region.key,
                        attempt = attempt + 1,
                        error = %e,
                        "probe attempt failed"
                    );
                    last_error = Some(e);
                    if attempt + 1 < self.retry.retry_count {
                        tokio::time::sleep(self.backoff(attempt + 1)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(RegionPingError::Timeout {
            duration_ms: self.timeout_duration.as_millis() as u64,
        }))
    }
}
