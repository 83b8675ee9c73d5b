//! Chat-completions client for the research collaborator
//!
//! One entry point, [`LlmClient::complete`], walks the configured model list
//! (default model first) and retries a model after rate limiting.

use std::time::Duration;

use reqwest::Client as HttpClient;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, OPENROUTER_BASE_URL};
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, LlmResponse, Message};

/// Attempts per model when the endpoint answers 429
const RATE_LIMIT_ATTEMPTS: u32 = 3;

const FIRST_BACKOFF: Duration = Duration::from_secs(1);

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry-after assumed when a 429 body carries none
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct LlmClient {
    http: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("models", &self.models())
            .finish()
    }
}

#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Endpoint root; overrides `llm.base_url`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout; overrides `llm.timeout_secs`
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(config.timeout_secs));
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .or_else(|| Some(config.base_url.clone()).filter(|url| !url.is_empty()))
            .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http,
            config,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new().config(config).api_key(api_key).build()
    }

    /// Build a client whose key comes from the environment
    pub fn from_env(config: LlmConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            Error::ConfigError(
                "No API key found. Set SCHOLARGRAPH_API_KEY or OPENROUTER_API_KEY.".to_string(),
            )
        })?;
        Self::new(config, api_key)
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// Models in the order they are tried
    pub fn models(&self) -> Vec<&str> {
        std::iter::once(self.config.default_model.as_str())
            .chain(self.config.fallback_models.iter().map(String::as_str))
            .collect()
    }

    /// Run one chat completion
    ///
    /// A model that is rate limited past its retries, or reported unavailable,
    /// hands over to the next one. Any other failure is returned at once.
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let mut last_error = None;

        for model in self.models() {
            let request = ChatRequest::new(model, messages.clone())
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens);

            match self.complete_on(&request).await {
                Ok(response) => {
                    info!(
                        model = %response.model,
                        tokens = response.tokens_used,
                        "Completion received"
                    );
                    if response.truncated {
                        warn!(model = %response.model, "Completion cut off at max_tokens");
                    }
                    return Ok(response);
                }
                Err(err) if moves_to_next_model(&err) => {
                    warn!(model = %model, error = %err, "Model failed, falling back");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::NoSuitableModel("no model configured".to_string())))
    }

    async fn complete_on(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let mut attempt = 1;
        loop {
            match self.post(request).await {
                Err(Error::RateLimited(retry_after)) if attempt < RATE_LIMIT_ATTEMPTS => {
                    let wait = backoff(attempt, retry_after);
                    warn!(
                        model = %request.model,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn post(&self, request: &ChatRequest) -> Result<LlmResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "POST chat/completions"
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", "Scholargraph")
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Unreadable completion: {}", e)))?;
        LlmResponse::from_chat_response(body)
            .ok_or_else(|| Error::LLMError("Completion had no choices".to_string()))
    }
}

fn status_error(status: u16, body: &str) -> Error {
    match status {
        429 => Error::RateLimited(retry_after(body).unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
        401 => Error::LLMError(
            "Unauthorized: check SCHOLARGRAPH_API_KEY or OPENROUTER_API_KEY".to_string(),
        ),
        402 => Error::LLMError("Payment required: the account is out of credits".to_string()),
        404 => Error::LLMError(format!("Model not found: {}", body)),
        500..=599 => Error::LLMError(format!("Server error ({}): {}", status, body)),
        _ => Error::LLMError(format!("HTTP {}: {}", status, body)),
    }
}

/// Errors that say nothing about the request itself, only about the model
fn moves_to_next_model(err: &Error) -> bool {
    const UNAVAILABLE: [&str; 6] = [
        "model not found",
        "unavailable",
        "no available provider",
        "overloaded",
        "capacity",
        "server error",
    ];
    match err {
        Error::RateLimited(_) => true,
        Error::LLMError(msg) => {
            let msg = msg.to_lowercase();
            UNAVAILABLE.iter().any(|needle| msg.contains(needle))
        }
        _ => false,
    }
}

/// Doubling delay from one second, at least the server's retry-after, capped
fn backoff(attempt: u32, retry_after_secs: u64) -> Duration {
    let doubled = FIRST_BACKOFF.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    doubled
        .max(Duration::from_secs(retry_after_secs))
        .min(MAX_BACKOFF)
}

fn retry_after(body: &str) -> Option<u64> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error")?.get("retry_after"))
        .and_then(serde_json::Value::as_u64)
}
