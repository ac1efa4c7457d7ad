//! Configuration management for Confab
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ConfabError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Main configuration structure for Confab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hosted model settings and credentials
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Where conversations are saved
    #[serde(default)]
    pub storage: StorageConfig,
    /// Admin controls
    #[serde(default)]
    pub admin: AdminConfig,
    /// Upload processing limits
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Hosted model configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the chat-completion service (required)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional organization scoping header
    #[serde(default)]
    pub organization: Option<String>,

    /// Optional project scoping header
    #[serde(default)]
    pub project: Option<String>,

    /// Base URL of the API (useful for tests and compatible services)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model used for conversation and summaries
    #[serde(default = "default_model")]
    pub model: String,

    /// Vision-capable model used for image descriptions
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Speech-to-text model
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Model used to derive conversation titles; falls back to `model`
    #[serde(default)]
    pub title_model: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            organization: None,
            project: None,
            api_base: default_api_base(),
            model: default_model(),
            vision_model: default_vision_model(),
            transcription_model: default_transcription_model(),
            title_model: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// Credentials never reach logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("transcription_model", &self.transcription_model)
            .field("title_model", &self.title_model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Session storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for session files; platform data dir when unset
    #[serde(default)]
    pub directory: Option<String>,
}

/// Admin configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Password gating the "clear conversation" control
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Upload processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Rows shown per table or sheet in a spreadsheet preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Maximum characters of extracted text kept per file
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_preview_rows() -> usize {
    50
}

fn default_max_document_chars() -> usize {
    200_000
}

fn default_max_upload_bytes() -> u64 {
    25 * 1024 * 1024
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            max_document_chars: default_max_document_chars(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfabError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ConfabError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.provider.api_key = Some(api_key);
        }

        if let Ok(org) = std::env::var("OPENAI_ORG_ID") {
            self.provider.organization = Some(org);
        }

        if let Ok(project) = std::env::var("OPENAI_PROJECT_ID") {
            self.provider.project = Some(project);
        }

        if let Ok(api_base) = std::env::var("CONFAB_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(model) = std::env::var("CONFAB_MODEL") {
            self.provider.model = model;
        }

        if let Ok(timeout) = std::env::var("CONFAB_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CONFAB_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(password) = std::env::var("CONFAB_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }

        if let Ok(dir) = std::env::var(crate::storage::SESSION_DIR_ENV) {
            self.storage.directory = Some(dir);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(dir) = &cli.session_dir {
            self.storage.directory = Some(dir.clone());
        }
    }

    /// Validate the configuration
    ///
    /// A missing API key is fatal: the application refuses to start rather
    /// than run without a usable gateway.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let has_key = self
            .provider
            .api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false);
        if !has_key {
            return Err(ConfabError::Config("OPENAI_API_KEY not set".to_string()).into());
        }

        if !self.provider.api_base.starts_with("http://")
            && !self.provider.api_base.starts_with("https://")
        {
            return Err(ConfabError::Config(format!(
                "provider.api_base must be an http(s) URL, got {}",
                self.provider.api_base
            ))
            .into());
        }

        for (field, value) in [
            ("provider.model", &self.provider.model),
            ("provider.vision_model", &self.provider.vision_model),
            (
                "provider.transcription_model",
                &self.provider.transcription_model,
            ),
        ] {
            if value.trim().is_empty() {
                return Err(ConfabError::Config(format!("{} cannot be empty", field)).into());
            }
        }

        if self.provider.timeout_seconds == 0 {
            return Err(ConfabError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.extraction.preview_rows == 0 {
            return Err(ConfabError::Config(
                "extraction.preview_rows must be greater than 0".to_string(),
            )
            .into());
        }

        if self.extraction.max_document_chars == 0 {
            return Err(ConfabError::Config(
                "extraction.max_document_chars must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Model used for title derivation
    pub fn title_model(&self) -> &str {
        self.provider
            .title_model
            .as_deref()
            .unwrap_or(&self.provider.model)
    }
}
