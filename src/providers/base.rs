//! Base provider trait and common types for Confab
//!
//! This module defines the Provider trait that the assistant gateway
//! implements, along with response structures shared by all providers.

use crate::error::{GatewayError, GatewayResult};
use crate::transcript::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage information from a completion
///
/// Tracks the number of tokens used in prompts and completions,
/// as reported by the AI provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// The reply, always with the assistant role
    pub message: Message,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a response without usage information
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a response with usage information
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// An encoded image ready to be sent to a vision model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Base64 encoded bytes (standard alphabet, padded)
    pub base64: String,
}

impl ImageData {
    /// Render as a `data:` URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Assistant gateway: a stateless request/response chat-completion service
///
/// Implementations must not retain conversation state between calls; the
/// full message list is supplied on every request.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use confab::error::GatewayResult;
/// use confab::providers::{CompletionResponse, Provider};
/// use confab::transcript::Message;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Provider for Echo {
///     fn model(&self) -> String {
///         "echo".to_string()
///     }
///
///     async fn complete(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
///         let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
///         Ok(CompletionResponse::new(Message::assistant(last)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of the chat model in use
    fn model(&self) -> String;

    /// Request one reply for `messages`
    async fn complete(&self, messages: &[Message]) -> GatewayResult<CompletionResponse>;

    /// Request a conversation title
    ///
    /// The default implementation uses the chat model.
    async fn complete_title(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
        self.complete(messages).await
    }

    /// Describe an image with a vision-capable model
    ///
    /// The default implementation reports that vision is unavailable.
    async fn describe_image(&self, _image: &ImageData, _prompt: &str) -> GatewayResult<String> {
        Err(GatewayError::Request(
            "image description is not supported by this provider".to_string(),
        ))
    }

    /// Transcribe an audio clip to text
    ///
    /// The default implementation reports that transcription is unavailable.
    async fn transcribe_audio(&self, _audio: &[u8], _file_name: &str) -> GatewayResult<String> {
        Err(GatewayError::Request(
            "audio transcription is not supported by this provider".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    #[async_trait]
    impl Provider for Minimal {
        fn model(&self) -> String {
            "minimal".to_string()
        }

        async fn complete(&self, _messages: &[Message]) -> GatewayResult<CompletionResponse> {
            Ok(CompletionResponse::new(Message::assistant("title")))
        }
    }

    #[test]
    fn test_token_usage_new() {
        let usage = TokenUsage::new(7, 3);
        assert_eq!(usage, TokenUsage {
            prompt_tokens: 7,
            completion_tokens: 3,
            total_tokens: 10
        });
    }

    #[test]
    fn test_completion_response_with_usage() {
        let response =
            CompletionResponse::with_usage(Message::assistant("hi"), TokenUsage::new(1, 2));
        assert_eq!(response.usage.unwrap().total_tokens, 3);
        assert_eq!(response.message.content, "hi");
    }

    #[test]
    fn test_image_data_url() {
        let image = ImageData {
            mime_type: "image/png".to_string(),
            base64: "AAAA".to_string(),
        };
        assert_eq!(image.data_url(), "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn test_default_title_uses_complete() {
        let response = Minimal.complete_title(&[Message::user("x")]).await.unwrap();
        assert_eq!(response.message.content, "title");
    }

    #[tokio::test]
    async fn test_default_vision_and_audio_unsupported() {
        let image = ImageData {
            mime_type: "image/png".to_string(),
            base64: String::new(),
        };
        assert!(Minimal.describe_image(&image, "Describe").await.is_err());
        assert!(Minimal.transcribe_audio(b"RIFF", "a.wav").await.is_err());
    }
}
