//! PII analyzer HTTP client
//!
//! Adapter over the external analyzer service. One request is issued per
//! text span; findings are normalized into the engine's entity shape.
//! Transport and decoding failures surface as typed errors so the
//! orchestrator can apply policy — the client never silently returns an
//! empty result.

use crate::{DetectError, Result};
use async_trait::async_trait;
use promptveil_core::config::PiiDetectionConfig;
use promptveil_core::entity::{Entity, EntitySource};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("promptveil/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the analyzer HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// End-to-end deadline per analyzer call
    pub request_timeout: Duration,

    /// TCP connect deadline
    pub connect_timeout: Duration,

    /// Idle connections kept pooled per host
    pub max_idle_per_host: usize,

    /// Backoff schedule for transient failures
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            max_idle_per_host: 16,
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpClientConfig {
    fn build_client(&self) -> Result<Client> {
        Client::builder()
            .use_rustls_tls()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DetectError::Unavailable(format!("analyzer client setup: {}", e)))
    }
}

/// Doubling backoff for transient analyzer failures. Permanent failures
/// (malformed responses, client-side errors) are never retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first
    pub budget: u32,

    /// Pause before the first retry; doubles on each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Fail on the first error.
    pub const fn none() -> Self {
        Self {
            budget: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn pause_before(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Drive `call` until it succeeds, fails permanently, or exhausts the
    /// budget; the final error is returned as-is.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut used = 0;
        loop {
            match call().await {
                Err(e) if e.is_retryable() && used < self.budget => {
                    let pause = self.pause_before(used);
                    used += 1;
                    warn!(error = %e, retry = used, ?pause, "transient analyzer failure");
                    tokio::time::sleep(pause).await;
                }
                outcome => return outcome,
            }
        }
    }
}

/// Analyzer connection settings, derived from the PII detection snapshot.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Analyzer base URL; requests go to {base_url}/analyze
    pub base_url: String,

    /// Categories requested per call
    pub entities: Vec<String>,

    /// Minimum confidence accepted
    pub score_threshold: f32,

    /// Language hint sent with every request
    pub language: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl AnalyzerConfig {
    pub fn from_detection_config(config: &PiiDetectionConfig) -> Self {
        Self {
            base_url: config.presidio_url.clone(),
            entities: config.entities.clone(),
            score_threshold: config.score_threshold,
            language: config
                .languages
                .first()
                .cloned()
                .unwrap_or_else(|| "en".to_string()),
            client_config: HttpClientConfig::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
    entities: &'a [String],
    score_threshold: f32,
}

#[derive(Debug, Deserialize)]
struct AnalyzerFinding {
    entity_type: String,
    start: usize,
    end: usize,
    score: f32,
}

/// Trait for PII detection over text spans.
#[async_trait]
pub trait PiiAnalyzer: Send + Sync {
    /// Detect PII in the given text, returning entities sorted by start.
    async fn analyze(&self, text: &str) -> Result<Vec<Entity>>;
}

/// HTTP client for the analyzer service.
pub struct AnalyzerClient {
    config: AnalyzerConfig,
    client: Client,
}

impl AnalyzerClient {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let client = config.client_config.build_client()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl PiiAnalyzer for AnalyzerClient {
    async fn analyze(&self, text: &str) -> Result<Vec<Entity>> {
        let url = format!("{}/analyze", self.config.base_url.trim_end_matches('/'));
        let body = AnalyzeRequest {
            text,
            language: &self.config.language,
            entities: &self.config.entities,
            score_threshold: self.config.score_threshold,
        };

        let retry = self.config.client_config.retry;
        let client = &self.client;
        let (url, body) = (&url, &body);
        let findings = retry
            .run(move || async move {
                let response = client
                    .post(url.as_str())
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| DetectError::Unavailable(e.to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(DetectError::Status {
                        status: status.as_u16(),
                        message,
                    });
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| DetectError::Unavailable(e.to_string()))?;
                serde_json::from_slice::<Vec<AnalyzerFinding>>(&bytes)
                    .map_err(|e| DetectError::Malformed(e.to_string()))
            })
            .await?;

        debug!(count = findings.len(), "analyzer returned findings");
        Ok(normalize_findings(
            text,
            findings,
            self.config.score_threshold,
        ))
    }
}

/// Convert analyzer findings (character offsets) into entities over byte
/// offsets, dropping anything that does not fit the text.
fn normalize_findings(
    text: &str,
    findings: Vec<AnalyzerFinding>,
    score_threshold: f32,
) -> Vec<Entity> {
    // char index -> byte offset, with one-past-the-end sentinel
    let byte_offsets: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut entities = Vec::with_capacity(findings.len());
    for finding in findings {
        if finding.score < score_threshold {
            debug!(
                entity_type = %finding.entity_type,
                score = finding.score,
                "dropping finding below threshold"
            );
            continue;
        }
        if finding.start >= finding.end || finding.end >= byte_offsets.len() {
            warn!(
                entity_type = %finding.entity_type,
                start = finding.start,
                end = finding.end,
                "dropping finding with out-of-range interval"
            );
            continue;
        }
        entities.push(Entity {
            category: finding.entity_type,
            start: byte_offsets[finding.start],
            end: byte_offsets[finding.end],
            score: finding.score,
            source: EntitySource::Analyzer,
        });
    }

    entities.sort_by_key(|e| (e.start, e.end));
    entities
}
