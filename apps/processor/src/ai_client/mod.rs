/// AI Client — the single point of entry for all Gemini API calls in the
/// pipeline.
///
/// ARCHITECTURAL RULE: no other module may call the Gemini API directly.
/// All structured-extraction traffic MUST go through this module so the
/// pacing state stays the only writer of the inter-call timestamp.
///
/// Model: gemini-1.5-flash (hardcoded; do not make configurable, to
/// prevent drift between environments sharing one quota)
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::models::resume::ParsedCandidateData;

pub mod prompts;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all extraction calls.
pub const MODEL: &str = "gemini-1.5-flash";
const MAX_OUTPUT_TOKENS: u32 = 8192;
const TEMPERATURE: f32 = 0.1;

/// Minimum gap between the end of one call and the start of the next.
pub const MIN_CALL_INTERVAL: Duration = Duration::from_millis(6000);
/// Rolling admission window approximating the upstream quota.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);
/// Call starts allowed per rolling window.
pub const MAX_CALLS_PER_WINDOW: usize = 10;

const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 5000;
const MAX_RETRY_DELAY_MS: u64 = 60_000;
const MAX_JITTER_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("AI returned empty content")]
    EmptyContent,
}

impl AiError {
    /// Transport and upstream-availability errors are worth a job-level
    /// retry. Rate limiting is handled inside this client and, once it
    /// escapes, is quota exhaustion, not a transient fault. Contract
    /// violations never heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::Http(_) | AiError::Upstream { .. })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (Gemini generateContent)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<&str>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Admission control
// ────────────────────────────────────────────────────────────────────────────

/// Local admission control approximating the upstream quota without a
/// shared counter across processes: a minimum interval measured from the
/// end of the previous call, plus a rolling window of call starts.
pub struct RatePacer {
    min_interval: Duration,
    window: Duration,
    max_calls: usize,
    state: Mutex<PacerState>,
}

#[derive(Default)]
struct PacerState {
    last_call_end: Option<Instant>,
    call_starts: VecDeque<Instant>,
}

impl RatePacer {
    pub fn new(min_interval: Duration, window: Duration, max_calls: usize) -> Self {
        Self {
            min_interval,
            window,
            max_calls,
            state: Mutex::new(PacerState::default()),
        }
    }

    /// Blocks until a call may start, then records the call start.
    /// The lock is never held across a sleep.
    pub async fn admit(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                while let Some(&front) = state.call_starts.front() {
                    if now.saturating_duration_since(front) >= self.window {
                        state.call_starts.pop_front();
                    } else {
                        break;
                    }
                }

                let mut wait = state
                    .last_call_end
                    .map(|end| (end + self.min_interval).saturating_duration_since(now))
                    .unwrap_or(Duration::ZERO);

                if state.call_starts.len() >= self.max_calls {
                    if let Some(&oldest) = state.call_starts.front() {
                        wait = wait.max((oldest + self.window).saturating_duration_since(now));
                    }
                }

                if wait.is_zero() {
                    state.call_starts.push_back(now);
                    return;
                }
                wait
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Records the end of a call; the minimum interval is measured from
    /// here, so slow upstream responses do not compress the gap.
    pub async fn record_call_end(&self) {
        self.state.lock().await.last_call_end = Some(Instant::now());
    }
}

impl Default for RatePacer {
    fn default() -> Self {
        Self::new(MIN_CALL_INTERVAL, RATE_WINDOW, MAX_CALLS_PER_WINDOW)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Retry helpers
// ────────────────────────────────────────────────────────────────────────────

static RETRY_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)retry[^0-9]{0,16}(\d+(?:\.\d+)?)\s*s").expect("hint pattern"));

/// Extracts an explicit "retry in N s" hint from an upstream error body.
/// Handles both prose ("please retry in 12.5s") and the structured
/// `"retryDelay": "12.5s"` field Gemini attaches to quota errors.
fn parse_retry_hint(message: &str) -> Option<u64> {
    let caps = RETRY_HINT.captures(message)?;
    let secs: f64 = caps[1].parse().ok()?;
    Some((secs * 1000.0).round() as u64)
}

/// Delay before retry `attempt` (zero-based). An upstream hint overrides
/// the exponential schedule and is clamped; the computed schedule doubles
/// from the initial delay, is capped, and carries up to 1 s of jitter.
fn retry_delay(attempt: u32, hint_ms: Option<u64>) -> Duration {
    if let Some(hint) = hint_ms {
        return Duration::from_millis(hint.min(MAX_RETRY_DELAY_MS));
    }
    let base = INITIAL_RETRY_DELAY_MS
        .saturating_mul(1u64 << attempt.min(10))
        .min(MAX_RETRY_DELAY_MS);
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    Duration::from_millis(base + jitter)
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Seam between orchestration and the concrete AI backend. Workers hold an
/// `Arc<dyn CandidateExtractor>`; tests script it.
#[async_trait]
pub trait CandidateExtractor: Send + Sync {
    async fn extract(&self, resume_text: &str) -> Result<ParsedCandidateData, AiError>;
}

/// The Gemini-backed extraction client: admission control, bounded retry
/// on rate limits, and response-contract enforcement.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    pacer: RatePacer,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            pacer: RatePacer::default(),
        }
    }

    /// Makes a paced call to the Gemini API and returns the response text.
    /// Retries only on 429; every other failure propagates immediately and
    /// the job layer decides whether to retry.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<String, AiError> {
        let request_body = GeminiRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart { text: system }],
            },
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json",
            },
        };
        let url = format!("{GEMINI_API_URL}/{MODEL}:generateContent");

        let mut hint_ms: Option<u64> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay(attempt - 1, hint_ms);
                warn!(
                    "Gemini rate limited, attempt {}/{}, retrying after {}ms",
                    attempt,
                    MAX_RETRIES,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            self.pacer.admit().await;
            let response = self
                .client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&request_body)
                .send()
                .await;
            self.pacer.record_call_end().await;

            let response = response.map_err(AiError::Http)?;
            let status = response.status();

            if status.as_u16() == 429 {
                let header_hint = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|secs| secs * 1000);
                let body = response.text().await.unwrap_or_default();
                hint_ms = parse_retry_hint(&body).or(header_hint);
                warn!("Gemini returned 429: {body}");
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AiError::Upstream {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GeminiResponse = response.json().await.map_err(AiError::Http)?;
            if let Some(usage) = &parsed.usage_metadata {
                debug!(
                    "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                    usage.prompt_token_count, usage.candidates_token_count
                );
            }

            let text = parsed.text();
            if text.trim().is_empty() {
                return Err(AiError::EmptyContent);
            }
            return Ok(text);
        }

        Err(AiError::RateLimited {
            retries: MAX_RETRIES,
        })
    }
}

#[async_trait]
impl CandidateExtractor for GeminiClient {
    async fn extract(&self, resume_text: &str) -> Result<ParsedCandidateData, AiError> {
        let prompt = prompts::EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", resume_text);
        let text = self.call(&prompt, prompts::EXTRACT_SYSTEM).await?;
        let json = strip_json_fences(&text);
        serde_json::from_str(json)
            .map_err(|e| AiError::InvalidResponse(format!("extraction contract violated: {e}")))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
