//! OpenAI-compatible provider implementation for Confab
//!
//! Talks to `/chat/completions` for conversation, titles and image
//! descriptions, and to `/audio/transcriptions` for speech-to-text.

use crate::config::ProviderConfig;
use crate::error::{ConfabError, GatewayError, GatewayResult, Result};
use crate::providers::{CompletionResponse, ImageData, Provider, TokenUsage};
use crate::transcript::{Message, Role};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completion provider for the OpenAI API and compatible services
///
/// # Examples
///
/// ```no_run
/// use confab::config::ProviderConfig;
/// use confab::providers::{OpenAiProvider, Provider};
/// use confab::transcript::Message;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ProviderConfig {
///     api_key: Some("sk-...".to_string()),
///     ..ProviderConfig::default()
/// };
/// let provider = OpenAiProvider::new(config)?;
/// let reply = provider.complete(&[Message::user("Hello!")]).await?;
/// println!("{}", reply.message.content);
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

/// Request body for /chat/completions
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: Role,
    content: ChatContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Response body from /chat/completions
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

/// Response body from /audio/transcriptions
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiProvider {
    /// Create a new provider from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the HTTP client cannot be
    /// built
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfabError::Config("OPENAI_API_KEY not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("confab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfabError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder.bearer_auth(&self.api_key);
        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org);
        }
        if let Some(project) = &self.config.project {
            builder = builder.header("OpenAI-Project", project);
        }
        builder
    }

    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> GatewayResult<CompletionResponse> {
        let request = ChatRequest { model, messages };

        tracing::debug!(
            "Sending chat request: model={}, {} messages",
            model,
            request.messages.len()
        );

        let response = self
            .authorized(self.client.post(self.endpoint("chat/completions")))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat request failed: {}", e);
                GatewayError::from(e)
            })?;

        let response = check_status(response).await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat response: {}", e);
            GatewayError::MalformedResponse(e.to_string())
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                GatewayError::MalformedResponse("response contained no reply".to_string())
            })?;

        let message = Message::assistant(content);
        Ok(match body.usage {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        })
    }
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| ChatMessage {
            role: m.role,
            content: ChatContent::Text(m.content.clone()),
        })
        .collect()
}

async fn check_status(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!("Gateway returned error {}: {}", status, body);

    Err(match status.as_u16() {
        401 | 403 => GatewayError::Authentication(body),
        408 => GatewayError::Timeout,
        429 => GatewayError::RateLimited(body),
        code => GatewayError::Status { status: code, body },
    })
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn model(&self) -> String {
        self.config.model.clone()
    }

    async fn complete(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
        self.chat(&self.config.model, to_chat_messages(messages)).await
    }

    async fn complete_title(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
        let model = self
            .config
            .title_model
            .as_deref()
            .unwrap_or(&self.config.model);
        self.chat(model, to_chat_messages(messages)).await
    }

    async fn describe_image(&self, image: &ImageData, prompt: &str) -> GatewayResult<String> {
        let messages = vec![ChatMessage {
            role: Role::User,
            content: ChatContent::Parts(vec![
                ContentPart::Text {
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
            ]),
        }];

        let response = self.chat(&self.config.vision_model, messages).await?;
        Ok(response.message.content)
    }

    async fn transcribe_audio(&self, audio: &[u8], file_name: &str) -> GatewayResult<String> {
        let part = reqwest::multipart::Part::bytes(audio.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .part("file", part);

        tracing::debug!(
            "Sending transcription request: model={}, {} bytes",
            self.config.transcription_model,
            audio.len()
        );

        let response = self
            .authorized(self.client.post(self.endpoint("audio/transcriptions")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Transcription request failed: {}", e);
                GatewayError::from(e)
            })?;

        let response = check_status(response).await?;

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        Ok(body.text)
    }
}
