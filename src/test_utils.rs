//! Test utilities for Confab
//!
//! This module provides temporary directory management, file fixtures and a
//! scripted assistant gateway for unit tests.

use crate::error::{ConfabError, GatewayError, GatewayResult};
use crate::providers::{CompletionResponse, ImageData, Provider};
use crate::transcript::Message;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given bytes
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, ConfabError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

type Script = Mutex<VecDeque<GatewayResult<String>>>;

/// Gateway that replays queued results and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Script,
    titles: Script,
    descriptions: Script,
    transcriptions: Script,
    requests: Mutex<Vec<Vec<Message>>>,
    title_requests: Mutex<Vec<Vec<Message>>>,
    image_prompts: Mutex<Vec<String>>,
}

fn push(script: &Script, result: GatewayResult<&str>) {
    script
        .lock()
        .unwrap()
        .push_back(result.map(str::to_string));
}

fn pop(script: &Script, what: &str) -> GatewayResult<String> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(GatewayError::Request(format!("no scripted {}", what))))
}

impl ScriptedProvider {
    /// Create a provider with empty scripts
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chat reply
    pub fn with_reply(self, result: GatewayResult<&str>) -> Self {
        push(&self.replies, result);
        self
    }

    /// Queue a title reply
    pub fn with_title(self, result: GatewayResult<&str>) -> Self {
        push(&self.titles, result);
        self
    }

    /// Queue an image description
    pub fn with_description(self, result: GatewayResult<&str>) -> Self {
        push(&self.descriptions, result);
        self
    }

    /// Queue an audio transcription
    pub fn with_transcription(self, result: GatewayResult<&str>) -> Self {
        push(&self.transcriptions, result);
        self
    }

    /// Chat requests received so far
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    /// Title requests received so far
    pub fn title_requests(&self) -> Vec<Vec<Message>> {
        self.title_requests.lock().unwrap().clone()
    }

    /// Prompts sent with image descriptions
    pub fn image_prompts(&self) -> Vec<String> {
        self.image_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn model(&self) -> String {
        "scripted".to_string()
    }

    async fn complete(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        pop(&self.replies, "reply").map(|text| CompletionResponse::new(Message::assistant(text)))
    }

    async fn complete_title(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
        self.title_requests.lock().unwrap().push(messages.to_vec());
        pop(&self.titles, "title").map(|text| CompletionResponse::new(Message::assistant(text)))
    }

    async fn describe_image(&self, _image: &ImageData, prompt: &str) -> GatewayResult<String> {
        self.image_prompts.lock().unwrap().push(prompt.to_string());
        pop(&self.descriptions, "description")
    }

    async fn transcribe_audio(&self, _audio: &[u8], _file_name: &str) -> GatewayResult<String> {
        pop(&self.transcriptions, "transcription")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    #[should_panic(expected = "does not contain")]
    fn test_assert_error_contains_wrong_message() {
        let result: Result<(), ConfabError> = Err(ConfabError::Config("different".to_string()));
        assert_error_contains(result, "not present");
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new()
            .with_reply(Ok("one"))
            .with_reply(Err(GatewayError::Timeout));

        let first = provider.complete(&[Message::user("a")]).await.unwrap();
        assert_eq!(first.message.content, "one");
        assert!(matches!(
            provider.complete(&[]).await,
            Err(GatewayError::Timeout)
        ));
        assert!(provider.complete(&[]).await.is_err());
        assert_eq!(provider.requests().len(), 3);
    }
}
