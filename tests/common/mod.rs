use async_trait::async_trait;
use confab::error::{GatewayError, GatewayResult};
use confab::providers::{CompletionResponse, ImageData, Provider};
use confab::storage::SessionStore;
use confab::transcript::Message;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (SessionStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SessionStore::new(tmp.path().join("sessions")).expect("failed to create store");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Minimal Word document holding one paragraph per entry
#[allow(dead_code)]
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer
        .start_file("word/document.xml", options)
        .expect("failed to start zip entry");
    writer
        .write_all(document.as_bytes())
        .expect("failed to write zip entry");
    writer.finish().expect("failed to finish zip").into_inner()
}

/// Provider answering from queues of canned results
#[allow(dead_code)]
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<GatewayResult<String>>>,
    titles: Mutex<VecDeque<GatewayResult<String>>>,
    descriptions: Mutex<VecDeque<GatewayResult<String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: GatewayError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn title(self, text: &str) -> Self {
        self.titles.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn failing_title(self) -> Self {
        self.titles
            .lock()
            .unwrap()
            .push_back(Err(GatewayError::Timeout));
        self
    }

    pub fn description(self, text: &str) -> Self {
        self.descriptions
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

fn next(queue: &Mutex<VecDeque<GatewayResult<String>>>, what: &str) -> GatewayResult<String> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(GatewayError::Request(format!("no canned {}", what))))
}

#[async_trait]
impl Provider for MockProvider {
    fn model(&self) -> String {
        "mock".to_string()
    }

    async fn complete(&self, messages: &[Message]) -> GatewayResult<CompletionResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        next(&self.replies, "reply").map(|text| CompletionResponse::new(Message::assistant(text)))
    }

    async fn complete_title(&self, _messages: &[Message]) -> GatewayResult<CompletionResponse> {
        next(&self.titles, "title").map(|text| CompletionResponse::new(Message::assistant(text)))
    }

    async fn describe_image(&self, _image: &ImageData, _prompt: &str) -> GatewayResult<String> {
        next(&self.descriptions, "description")
    }
}
