//! # parley-client
//!
//! Completion gateway for OpenAI-compatible chat endpoints.
//!
//! The [`LLMClient`] trait is the seam between the conversation loop and a
//! model. One call to [`LLMClient::chat`] sends the whole conversation,
//! optionally with a tool catalog and a JSON-schema response constraint, and
//! returns the first choice's message with vendor reasoning fields removed.
//!
//! ## Example
//!
//! ```no_run
//! use parley_client::{LLMClient, OpenAIClient};
//! use parley_common::{ChatRequest, Config, Message};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new("https://api.openai.com/v1", "gpt-4o-mini")
//!     .with_api_key("your-api-key");
//! let client = OpenAIClient::new(config)?;
//!
//! let request = ChatRequest::new(vec![Message::user("Hello, world!")]);
//! let response = client.chat(&request).await?;
//! println!("Response: {}", response.message.text());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use parley_common::{ChatRequest, ChatResponse, Config};

pub mod error;
pub mod openai;

pub use error::ClientError;
pub use openai::OpenAIClient;

/// Trait for completion gateway implementations.
///
/// Implementations must be thread-safe (Send + Sync) so a single client can
/// serve concurrent conversations.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Get the client's configuration.
    fn config(&self) -> &Config;

    /// Request one completion for the given conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request fails validation
    /// - Network communication fails
    /// - The API returns a non-success status
    /// - The response cannot be parsed or carries no choices
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Validate a chat request before sending.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if the request has no messages.
    fn validate_request(&self, request: &ChatRequest) -> Result<()> {
        request
            .validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl<T: LLMClient + ?Sized> LLMClient for Arc<T> {
    fn config(&self) -> &Config {
        (**self).config()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        (**self).chat(request).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use chrono::Utc;
    use parley_common::chat::Message;

    struct EchoClient {
        config: Config,
    }

    #[async_trait]
    impl LLMClient for EchoClient {
        fn config(&self) -> &Config {
            &self.config
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.validate_request(request)?;
            let last = request.messages.last().map(Message::text).unwrap_or_default();
            Ok(ChatResponse {
                message: Message::assistant(last),
                model: self.config.model.clone(),
                usage: None,
                finish_reason: None,
                created_at: Utc::now(),
                response_id: None,
            })
        }
    }

    fn echo() -> EchoClient {
        EchoClient {
            config: Config::new("http://localhost", "echo"),
        }
    }

    #[tokio::test]
    async fn test_validate_request_rejects_empty() {
        let err = echo().chat(&ChatRequest::new(Vec::new())).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_arc_dyn_client_delegates() {
        let client: Arc<dyn LLMClient> = Arc::new(echo());
        assert_eq!(client.config().model, "echo");

        let response = client
            .chat(&ChatRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        assert_eq!(response.message.text(), "ping");
    }
}
