//! OpenAI-compatible chat-completions client with exponential backoff

use crate::config::LlmConfig;
use crate::llm::{LlmError, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Client for any endpoint speaking the `/chat/completions` protocol
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl OpenAiClient {
    /// Creates a client with the default retry policy (3 attempts, 500ms base, 8s cap)
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL ending before `/chat/completions`
    /// * `model` - Model name sent with every request
    /// * `api_key` - Bearer token
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(OpenAiClient)` - Ready to send requests
    /// * `Err(LlmError)` - If the HTTP client cannot be built
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        })
    }

    /// Creates a client from the `[llm]` config section, reading the API key
    /// from the configured environment variable
    ///
    /// # Errors
    ///
    /// [`LlmError::MissingApiKey`] when the variable is unset.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        let client = Self::new(
            &config.endpoint,
            &config.model,
            &api_key,
            Duration::from_secs(config.timeout_seconds),
        )?;
        let (base_delay, max_delay) = (client.base_delay, client.max_delay);
        Ok(client.with_retry(config.max_attempts, base_delay, max_delay))
    }

    /// Overrides the retry policy
    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    async fn send_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_response(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.send_once(system_prompt, user_prompt).await {
                Ok(content) => {
                    debug!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "LLM call succeeded"
                    );
                    return Ok(content);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(attempt, max = self.max_attempts, ?delay, error = %e, "LLM call failed; backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %e,
                        "LLM call failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}
