//! Content extractors: turn uploaded files into text the model can use
//!
//! Documents are parsed locally on a blocking thread. Images and voice clips
//! go through the assistant gateway (vision and speech-to-text). Every file
//! in a batch is processed independently; one failure never stops the rest.

pub mod audio;
pub mod office;
pub mod pdf;
pub mod sheet;
pub mod vision;

use crate::config::ExtractionConfig;
use crate::error::{ConfabError, ExtractionError};
use crate::providers::Provider;
use crate::transcript::Message;
use anyhow::{anyhow, Context};
use std::fmt;
use std::path::{Path, PathBuf};

/// System instruction used for document summaries
pub const SUMMARY_PROMPT: &str = "Summarise this document clearly in bullet points.";

/// Prefix of summary notes in the transcript
pub const SUMMARY_PREFIX: &str = "Document Summary:";

/// Prefix of image analysis notes in the transcript
pub const IMAGE_PREFIX: &str = "Image Analysis:";

/// Kind of an uploaded file, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    /// Portable Document Format
    Pdf,
    /// Word document (.docx)
    Word,
    /// PowerPoint presentation (.pptx)
    PowerPoint,
    /// Comma-separated values
    Csv,
    /// Excel workbook (.xlsx)
    Excel,
    /// UTF-8 plain text
    Text,
    /// Raster image
    Image,
    /// Voice clip
    Audio,
}

impl UploadKind {
    /// Detect the kind from a file name
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::extract::UploadKind;
    /// use std::path::Path;
    ///
    /// assert_eq!(UploadKind::from_path(Path::new("Q3.XLSX")), Some(UploadKind::Excel));
    /// assert_eq!(UploadKind::from_path(Path::new("memo.wav")), Some(UploadKind::Audio));
    /// assert_eq!(UploadKind::from_path(Path::new("setup.exe")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Word,
            "pptx" => Self::PowerPoint,
            "csv" => Self::Csv,
            "xlsx" | "xlsm" => Self::Excel,
            "txt" | "md" | "markdown" | "log" | "json" => Self::Text,
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => Self::Image,
            other if audio::AUDIO_EXTENSIONS.contains(&other) => Self::Audio,
            _ => return None,
        })
    }

    /// True for kinds parsed locally into text
    pub fn is_document(self) -> bool {
        !matches!(self, Self::Image | Self::Audio)
    }

    fn context_label(self) -> &'static str {
        match self {
            Self::Csv | Self::Excel => "Spreadsheet",
            Self::Image => "Image",
            Self::Audio => "Audio transcript",
            _ => "Document",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::PowerPoint => "powerpoint",
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        };
        write!(f, "{}", name)
    }
}

/// A raw file handed to an extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File name shown to the user and the model
    pub name: String,
    /// Declared kind
    pub kind: UploadKind,
    /// File content
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Create an upload from bytes already in memory
    pub fn new(name: impl Into<String>, kind: UploadKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// Read a file from disk
    ///
    /// # Errors
    ///
    /// Unsupported extensions, unreadable files and files larger than
    /// `max_bytes` are reported as [`ExtractionError`].
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self, ExtractionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let kind = UploadKind::from_path(path)
            .ok_or_else(|| ExtractionError::new(&name, "unsupported file type"))?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ExtractionError::new(&name, format!("cannot read file: {}", e)))?;
        if !metadata.is_file() {
            return Err(ExtractionError::new(&name, "not a regular file"));
        }
        if metadata.len() > max_bytes {
            return Err(ExtractionError::new(
                &name,
                format!(
                    "file too large: {} bytes (limit: {} bytes)",
                    metadata.len(),
                    max_bytes
                ),
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::new(&name, format!("cannot read file: {}", e)))?;

        Ok(Self { name, kind, bytes })
    }
}

/// Text obtained from one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// File name
    pub name: String,
    /// Kind of the source file
    pub kind: UploadKind,
    /// Extracted text, description or transcription
    pub text: String,
}

/// Outcome of extracting a batch of files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files that produced text, in input order
    pub documents: Vec<ExtractedDocument>,
    /// Files that failed, in input order
    pub failures: Vec<ExtractionError>,
}

impl BatchReport {
    /// True when no file produced text
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The single system message carrying all extracted text
    ///
    /// `None` when no file produced text.
    pub fn context_message(&self) -> Option<String> {
        if self.documents.is_empty() {
            return None;
        }

        let mut out = String::from("Content of the attached files:");
        for doc in &self.documents {
            out.push_str(&format!(
                "\n\n{}: {}\n{}",
                doc.kind.context_label(),
                doc.name,
                doc.text
            ));
        }
        Some(out)
    }
}

/// Parse a document into plain text
///
/// CPU-bound; [`Extractor`] runs it on a blocking thread.
pub fn parse_document(kind: UploadKind, bytes: &[u8], preview_rows: usize) -> anyhow::Result<String> {
    match kind {
        UploadKind::Pdf => pdf::pdf_text(bytes),
        UploadKind::Word => office::docx_text(bytes),
        UploadKind::PowerPoint => office::pptx_text(bytes),
        UploadKind::Csv => sheet::csv_preview(bytes, preview_rows),
        UploadKind::Excel => sheet::xlsx_preview(bytes, preview_rows),
        UploadKind::Text => String::from_utf8(bytes.to_vec()).context("text file is not valid UTF-8"),
        UploadKind::Image | UploadKind::Audio => Err(anyhow!("{} files are not documents", kind)),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n[truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Runs the extractors for one user action
///
/// # Examples
///
/// ```no_run
/// use confab::config::{Config, ExtractionConfig};
/// use confab::extract::Extractor;
/// use confab::providers::create_provider;
/// use std::path::PathBuf;
///
/// # async fn example(config: Config) -> anyhow::Result<()> {
/// let provider = create_provider(&config.provider, None)?;
/// let extractor = Extractor::new(provider.as_ref(), &config.extraction);
/// let report = extractor.extract_paths(&[PathBuf::from("report.pdf")]).await;
/// for failure in &report.failures {
///     eprintln!("skipped {}", failure);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Extractor<'a> {
    gateway: &'a dyn Provider,
    config: &'a ExtractionConfig,
}

impl<'a> Extractor<'a> {
    /// Create an extractor using `gateway` for images and audio
    pub fn new(gateway: &'a dyn Provider, config: &'a ExtractionConfig) -> Self {
        Self { gateway, config }
    }

    /// Text for one upload
    ///
    /// Documents yield their text, images a description, audio a
    /// transcription. Empty results are errors.
    pub async fn extract(&self, upload: &Upload) -> Result<String, ExtractionError> {
        let fail = |message: String| ExtractionError::new(&upload.name, message);

        let text = match upload.kind {
            UploadKind::Image => {
                let image = vision::prepare_image(&upload.bytes).map_err(|e| fail(format!("{:#}", e)))?;
                self.gateway
                    .describe_image(&image, vision::IMAGE_PROMPT)
                    .await
                    .map_err(|e| fail(format!("image analysis failed: {}", e)))?
            }
            UploadKind::Audio => {
                audio::check_clip(&upload.bytes).map_err(|e| fail(e.to_string()))?;
                self.gateway
                    .transcribe_audio(&upload.bytes, &upload.name)
                    .await
                    .map_err(|e| fail(format!("transcription failed: {}", e)))?
            }
            _ => self.document_text(upload).await?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(fail("No extractable text found".to_string()));
        }

        tracing::info!(
            "Extracted {} ({}, {} chars)",
            upload.name,
            upload.kind,
            text.chars().count()
        );
        Ok(truncate_chars(text, self.config.max_document_chars))
    }

    async fn document_text(&self, upload: &Upload) -> Result<String, ExtractionError> {
        let kind = upload.kind;
        let bytes = upload.bytes.clone();
        let rows = self.config.preview_rows;

        match tokio::task::spawn_blocking(move || parse_document(kind, &bytes, rows)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionError::new(&upload.name, format!("{:#}", e))),
            Err(e) => Err(ExtractionError::new(
                &upload.name,
                format!("extraction task failed: {}", e),
            )),
        }
    }

    /// Extract every upload, collecting failures instead of stopping
    pub async fn extract_batch(&self, uploads: &[Upload]) -> BatchReport {
        let mut report = BatchReport::default();
        for upload in uploads {
            match self.extract(upload).await {
                Ok(text) => report.documents.push(ExtractedDocument {
                    name: upload.name.clone(),
                    kind: upload.kind,
                    text,
                }),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", upload.name, e.message);
                    report.failures.push(e);
                }
            }
        }
        report
    }

    /// Read and extract files from disk, collecting failures
    pub async fn extract_paths(&self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();
        for path in paths {
            let upload = match Upload::from_path(path, self.config.max_upload_bytes).await {
                Ok(upload) => upload,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e.message);
                    report.failures.push(e);
                    continue;
                }
            };
            let single = self.extract_batch(std::slice::from_ref(&upload)).await;
            report.documents.extend(single.documents);
            report.failures.extend(single.failures);
        }
        report
    }

    /// Summarise document text into a transcript note
    ///
    /// # Errors
    ///
    /// Returns [`ConfabError::Gateway`] when the model call fails.
    pub async fn summarize(&self, text: &str) -> Result<Message, ConfabError> {
        let request = [Message::system(SUMMARY_PROMPT), Message::user(text)];
        let response = self.gateway.complete(&request).await?;
        Ok(Message::assistant(format!(
            "{}\n\n{}",
            SUMMARY_PREFIX, response.message.content
        )))
    }

    /// Describe an image into a transcript note
    pub async fn describe(&self, upload: &Upload) -> Result<Message, ExtractionError> {
        if upload.kind != UploadKind::Image {
            return Err(ExtractionError::new(&upload.name, "not an image"));
        }
        let description = self.extract(upload).await?;
        Ok(Message::assistant(format!("{}\n\n{}", IMAGE_PREFIX, description)))
    }

    /// Transcribe a voice clip into a user message
    pub async fn transcribe(&self, upload: &Upload) -> Result<Message, ExtractionError> {
        if upload.kind != UploadKind::Audio {
            return Err(ExtractionError::new(&upload.name, "not an audio file"));
        }
        Ok(Message::user(self.extract(upload).await?))
    }
}
