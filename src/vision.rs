//! Pattern C: reading screenshots through multimodal inference services.
//!
//! Providers are tried in order. Each one is retried on rate limiting with a
//! linear backoff; any other failure moves on to the next provider. Every try
//! is kept as an [`Attempt`] so callers can see why a provider was skipped.

pub mod gemini;
pub mod openai;

use core::{fmt, time::Duration};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::{
    calc::CalculationTables,
    config::ConfigError,
    format::{self, DrawRecord},
    util::excerpt,
};

pub const EXCERPT_CHARS: usize = 200;

pub const RESULTS_PROMPT: &str = "\
This screenshot shows Thai lottery results. Read every lottery block and reply \
with JSON only, no prose, in the form \
{\"results\": [{\"lottery_type\": \"...\", \"lottery_name\": \"...\", \
\"draw_date\": \"YYYY-MM-DD\", \"draw_date_source_text\": \"...\", \
\"full_number\": \"...\", \"top3\": \"...\", \"bottom2\": \"...\"}]}. \
lottery_type must be one of thai_government, malaysia, gsb, baac, lao_pattana, \
lao_hd, lao_star, hanoi_special, hanoi_normal, hanoi_vip. Write every number as \
a string and keep leading zeros. Use null for anything you cannot read.";

pub const CALCULATION_PROMPT: &str = "\
This screenshot shows a Thai lottery calculation page. Reply with JSON only, \
no prose, in the form \
{\"daily_calculation\": {\"top3\": [\"123\"], \"top3_recommended\": [], \
\"bottom2\": [\"45\"], \"bottom2_recommended\": [], \"running_number\": \"7\", \
\"full_set_number\": \"3\"}, \
\"digit_frequency\": [{\"digit\": 0, \"top3_count\": 0, \"bottom2_count\": 0, \"total\": 0}], \
\"statistics_30_draws\": {\"bottom2\": [{\"number\": \"12\", \"count\": 3}], \
\"top3\": [{\"number\": \"123\", \"count\": 2}]}}. \
Numbers are strings with leading zeros; counts are integers. Use empty lists or \
null for tables that are not visible.";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("rate limited")]
    RateLimited,

    #[error("{provider}: still rate limited after {attempts} attempts")]
    MaxRetriesExceeded { provider: &'static str, attempts: u32 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {excerpt}")]
    Api {
        provider: &'static str,
        status: u16,
        excerpt: String,
    },

    #[error("cannot parse reply as JSON: {excerpt}")]
    Malformed { excerpt: String },

    #[error("all vision providers failed: {}", AttemptLog(.0))]
    AllProvidersFailed(Vec<Attempt>),
}

impl VisionError {
    pub fn malformed(text: &str) -> Self {
        Self::Malformed {
            excerpt: excerpt(text, EXCERPT_CHARS),
        }
    }
}

/// One provider's final outcome within a [`VisionReader::read`] call.
#[derive(Debug)]
pub struct Attempt {
    pub provider: &'static str,
    pub outcome: Result<(), VisionError>,
}

struct AttemptLog<'a>(&'a [Attempt]);

impl fmt::Display for AttemptLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match &attempt.outcome {
                Ok(()) => write!(f, "{}: ok", attempt.provider)?,
                Err(e) => write!(f, "{}: {e}", attempt.provider)?,
            }
        }
        Ok(())
    }
}

#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends one prompt plus a PNG image, returning the raw reply text.
    /// A rate-limit response must come back as [`VisionError::RateLimited`].
    async fn complete(&self, prompt: &str, png: &[u8]) -> Result<String, VisionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
        }
    }

    /// Wait after the `attempt`-th rate-limited try (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Body of a successful response; 429 becomes [`VisionError::RateLimited`].
async fn success_body(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String, VisionError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(VisionError::RateLimited);
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(VisionError::Api {
            provider,
            status: status.as_u16(),
            excerpt: excerpt(&body, EXCERPT_CHARS),
        });
    }
    Ok(body)
}

static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Decodes a reply that is expected to contain one JSON value: as-is, then
/// inside a fenced code block, then the outermost brace span.
pub fn parse_reply(text: &str) -> Result<Value, VisionError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(inner) = FENCED.captures(trimmed).and_then(|c| c.get(1))
        && let Ok(value) = serde_json::from_str(inner.as_str().trim())
    {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
        && let Ok(value) = serde_json::from_str(&trimmed[start..=end])
    {
        return Ok(value);
    }

    Err(VisionError::malformed(text))
}

/// Calls one provider, sleeping `base × attempt` after each rate-limited try.
pub async fn call_with_retry(
    provider: &dyn VisionProvider,
    policy: RetryPolicy,
    prompt: &str,
    png: &[u8],
) -> Result<String, VisionError> {
    let name = provider.name();
    for attempt in 1..=policy.max_attempts {
        match provider.complete(prompt, png).await {
            Err(VisionError::RateLimited) => {
                if attempt < policy.max_attempts {
                    let wait = policy.backoff(attempt);
                    tracing::warn!(target: "vision", "{name} rate limited ({attempt}/{}), waiting {wait:?}", policy.max_attempts);
                    tokio::time::sleep(wait).await;
                }
            }
            other => return other,
        }
    }
    Err(VisionError::MaxRetriesExceeded {
        provider: name,
        attempts: policy.max_attempts,
    })
}

#[derive(Debug)]
pub struct Reading<T = Value> {
    pub value: T,
    pub provider: &'static str,
    pub attempts: Vec<Attempt>,
}

/// Tables reply decoded and cleaned like the text scan.
fn decode_tables(value: Value) -> Result<CalculationTables, VisionError> {
    let text = value.to_string();
    serde_json::from_value::<CalculationTables>(value)
        .map(CalculationTables::sanitized)
        .map_err(|e| {
            tracing::debug!(target: "vision", "tables reply does not decode: {e}");
            VisionError::malformed(&text)
        })
}

pub struct VisionReader {
    providers: Vec<Box<dyn VisionProvider>>,
    policy: RetryPolicy,
}

impl VisionReader {
    pub fn new(
        providers: Vec<Box<dyn VisionProvider>>,
        policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::NoVisionCredential);
        }
        Ok(Self { providers, policy })
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn read(&self, prompt: &str, png: &[u8]) -> Result<Reading, VisionError> {
        self.read_with(prompt, png, Ok).await
    }

    /// Like [`read`](Self::read), but a reply that `decode` rejects counts as
    /// that provider failing.
    pub async fn read_with<T>(
        &self,
        prompt: &str,
        png: &[u8],
        decode: impl Fn(Value) -> Result<T, VisionError>,
    ) -> Result<Reading<T>, VisionError> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let name = provider.name();
            let outcome = call_with_retry(provider.as_ref(), self.policy, prompt, png)
                .await
                .and_then(|text| parse_reply(&text))
                .and_then(&decode);

            match outcome {
                Ok(value) => {
                    tracing::info!(target: "vision", "\x1b[36m{name} answered\x1b[0m");
                    attempts.push(Attempt {
                        provider: name,
                        outcome: Ok(()),
                    });
                    return Ok(Reading {
                        value,
                        provider: name,
                        attempts,
                    });
                }
                Err(e) => {
                    tracing::warn!(target: "vision", "\x1b[31m{name} failed\x1b[0m: {e}");
                    attempts.push(Attempt {
                        provider: name,
                        outcome: Err(e),
                    });
                }
            }
        }

        Err(VisionError::AllProvidersFailed(attempts))
    }

    /// Calculation tables from a screenshot, cleaned like the text scan.
    pub async fn read_tables(&self, png: &[u8]) -> Result<CalculationTables, VisionError> {
        Ok(self.read_with(CALCULATION_PROMPT, png, decode_tables).await?.value)
    }

    /// Draw records from a screenshot of a results page.
    pub async fn read_results(&self, png: &[u8]) -> Result<Vec<DrawRecord>, VisionError> {
        let reading = self.read(RESULTS_PROMPT, png).await?;
        Ok(format::merge(format::loose_candidates(reading.value)))
    }
}
