use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::ollama_types::{chat_response_content, ChatRequest};
use super::types::LlmClient;
use super::{BackendError, JustificationError};
use crate::config::{ConfigError, GenerationConfig};

/// Delay before the first retry; doubles on each further retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Ollama HTTP client for the `/api/chat` endpoint.
pub struct OllamaClient {
    chat_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for the backend described by `config`.
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self::with_client(config, client))
    }

    /// Use a pre-built HTTP client (proxy or TLS settings owned by the caller).
    pub fn with_client(config: &GenerationConfig, client: reqwest::blocking::Client) -> Self {
        Self {
            chat_url: config.chat_url(),
            client,
            timeout_secs: config.timeout.as_secs(),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

impl LlmClient for OllamaClient {
    fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    BackendError::Connection(self.chat_url.clone())
                } else {
                    BackendError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else {
                BackendError::Decode(e.to_string())
            }
        })?;

        Ok(chat_response_content(&body))
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.retries, DEFAULT_BASE_DELAY)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt `attempt` (0-based): base, 2×base, 4×base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Send `request`, retrying transient failures according to `policy`.
///
/// The same payload is reused for every attempt. Returns the raw content of
/// the first successful response.
pub fn generate_with_retry(
    llm: &dyn LlmClient,
    request: &ChatRequest,
    policy: &RetryPolicy,
) -> Result<String, JustificationError> {
    let max_attempts = policy.max_attempts();
    let mut attempt: u32 = 0;

    loop {
        match llm.chat(request) {
            Ok(content) => {
                if attempt > 0 {
                    tracing::info!(
                        attempt = attempt + 1,
                        "Generation backend succeeded after retry"
                    );
                }
                return Ok(content);
            }
            Err(e) if attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Generation backend call failed, retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    attempts = attempt + 1,
                    error = %e,
                    "Generation backend unavailable, giving up"
                );
                return Err(JustificationError::BackendUnavailable {
                    attempts: attempt + 1,
                    source: e,
                });
            }
        }
    }
}

/// Scripted LLM client for tests: plays back queued outcomes, then repeats
/// the fallback.
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    fallback: Box<dyn Fn() -> Result<String, BackendError> + Send + Sync>,
    calls: AtomicU32,
    last_request: Mutex<Option<ChatRequest>>,
}

impl MockLlmClient {
    /// Always answers with `response`.
    pub fn new(response: &str) -> Self {
        let response = response.to_string();
        Self::with_fallback(move || Ok(response.clone()))
    }

    /// Always fails with a 503.
    pub fn unavailable() -> Self {
        Self::with_fallback(|| {
            Err(BackendError::Status {
                status: 503,
                body: "service unavailable".into(),
            })
        })
    }

    fn with_fallback<F>(fallback: F) -> Self
    where
        F: Fn() -> Result<String, BackendError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Box::new(fallback),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Queue `count` connection failures ahead of the fallback.
    pub fn failing_first(self, count: usize) -> Self {
        {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            for _ in 0..count {
                script.push_back(Err(BackendError::Connection("http://mock".into())));
            }
        }
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl LlmClient for MockLlmClient {
    fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        scripted.unwrap_or_else(|| (self.fallback)())
    }
}
