//! OpenAI-compatible client implementation.
//!
//! # Examples
//!
//! ```no_run
//! use parley_client::{LLMClient, OpenAIClient};
//! use parley_common::{ChatRequest, Config, Message};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new("http://localhost:12434/engines/v1", "ai/qwen3")
//!     .with_timeout_seconds(120);
//! let client = OpenAIClient::new(config)?;
//!
//! let request = ChatRequest::new(vec![
//!     Message::system("You are a helpful assistant"),
//!     Message::user("Hello!"),
//! ]);
//! let response = client.chat(&request).await?;
//! println!("Response: {}", response.message.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - **Authentication errors (401)**: invalid or missing API keys
//! - **Rate limiting (429)**: reported with the `Retry-After` hint, never retried here
//! - **Server errors (5xx)**: reported as service unavailable
//! - **Invalid responses**: missing choices or malformed bodies
//!
//! API keys are held in a `secrecy::SecretString` and only exposed while
//! building the `Authorization` header.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use url::Url;

use parley_common::client::{ChatRequest, ChatResponse, Config};

use crate::LLMClient;
use crate::error::{ClientError, ErrorResponse};
use crate::openai::{ChatCompletionRequest, ChatCompletionResponse, strip_reasoning};

const COMPLETIONS_ENDPOINT: &str = "chat/completions";

/// Client for OpenAI-compatible chat-completion endpoints.
///
/// Sends exactly one HTTP request per [`LLMClient::chat`] call.
#[derive(Clone)]
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: Url,
    config: Arc<Config>,
}

// Custom Debug implementation to avoid exposing API key
impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create a new client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the base URL cannot
    /// be parsed, or the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClientError::ConfigurationError(e.to_string()))?;

        // Trailing slash so that joining keeps any path prefix such as /v1
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| {
            ClientError::ConfigurationError(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;

        // None means no timeout (useful for slow hardware/long-running requests)
        let client = match config.timeout_seconds {
            Some(timeout) => reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()?,
            None => reqwest::Client::builder().build()?,
        };

        Ok(Self {
            client,
            base_url,
            config: Arc::new(config),
        })
    }

    /// Set the model to use for chat completions.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    /// Full URL of the chat-completions endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{COMPLETIONS_ENDPOINT}", self.base_url)
    }

    async fn make_request<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(endpoint).map_err(|e| {
            ClientError::ConfigurationError(format!("Invalid endpoint '{endpoint}': {e}"))
        })?;

        let mut request_builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.config.api_key {
            request_builder = request_builder.header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            );
        }

        let response = request_builder
            .body(serde_json::to_string(body).map_err(ClientError::SerializationError)?)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::TimeoutError
                } else {
                    ClientError::NetworkError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.map_err(|e| {
                warn!("Failed to read error response body: {e}");
                ClientError::NetworkError(e)
            })?;

            // Extract the error message from structured response or use raw text
            let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(parsed) => parsed.error.message,
                Err(parse_err) => {
                    debug!(
                        "Failed to parse error response as JSON: {parse_err}. Using raw text instead."
                    );
                    error_text
                }
            };

            error!(
                "API request failed with status {}: {}",
                status.as_u16(),
                message
            );

            return Err(match status.as_u16() {
                401 => ClientError::AuthenticationError(message),
                429 => ClientError::RateLimitError {
                    message,
                    retry_after,
                },
                code if status.is_server_error() => ClientError::ServiceUnavailable {
                    status: code,
                    message,
                },
                code => ClientError::RequestError {
                    status: code,
                    message,
                },
            });
        }

        let response_text = response.text().await?;
        debug!("Raw API response: {response_text}");
        serde_json::from_str(&response_text).map_err(ClientError::SerializationError)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl LLMClient for OpenAIClient {
    fn config(&self) -> &Config {
        &self.config
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.validate_request(request)?;

        let body = ChatCompletionRequest::from((request, self.config.as_ref()));
        debug!(
            "Requesting completion from {} with {} messages and {} tools",
            body.model,
            body.messages.len(),
            body.tools.map_or(0, <[_]>::len)
        );

        let response: ChatCompletionResponse =
            self.make_request(COMPLETIONS_ENDPOINT, &body).await?;

        let Some(choice) = response.choices.into_iter().next() else {
            warn!(
                "Received empty choices array from API. Response ID: {}, Model: {}",
                response.id, response.model
            );
            return Err(
                ClientError::InvalidResponse("API returned no choices in response".to_string())
                    .into(),
            );
        };

        let mut message = choice.message;
        strip_reasoning(&mut message);

        let finish_reason = choice
            .finish_reason
            .as_ref()
            .and_then(|reason| reason.parse().ok());

        Ok(ChatResponse {
            message,
            model: response.model,
            usage: response.usage,
            finish_reason,
            created_at: DateTime::from_timestamp(i64::try_from(response.created).unwrap_or(0), 0)
                .unwrap_or_else(Utc::now),
            response_id: Some(response.id).filter(|id| !id.is_empty()),
        })
    }
}
