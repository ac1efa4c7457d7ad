//! File actions
//!
//! Attach, summarise, describe and transcribe files into the current
//! conversation. The interactive slash commands and the one-shot
//! subcommands share these handlers.

use super::{print_failures, print_outcome, AppContext};
use crate::config::Config;
use crate::error::Result;
use crate::extract::{Extractor, Upload};
use anyhow::bail;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Extract `paths` and keep their text as context for following prompts
///
/// Unreadable files are reported and skipped. Fails only when no file at
/// all could be read.
pub async fn attach(ctx: &mut AppContext, paths: &[PathBuf]) -> Result<()> {
    let report = Extractor::new(ctx.provider.as_ref(), &ctx.config.extraction)
        .extract_paths(paths)
        .await;

    print_failures(&report.failures);

    let Some(context) = report.context_message() else {
        bail!("None of the files could be read");
    };

    for document in &report.documents {
        println!(
            "{}",
            format!("Attached {} ({})", document.name, document.kind).green()
        );
    }
    println!();

    ctx.attached = Some(context);
    Ok(())
}

async fn open_upload(ctx: &AppContext, path: &Path) -> Result<Upload> {
    Ok(Upload::from_path(path, ctx.config.extraction.max_upload_bytes).await?)
}

/// Add a bullet-point summary of a document to the conversation
pub async fn summarize(ctx: &mut AppContext, path: &Path) -> Result<()> {
    let upload = open_upload(ctx, path).await?;
    if !upload.kind.is_document() {
        bail!("{}: not a document", upload.name);
    }

    let extractor = Extractor::new(ctx.provider.as_ref(), &ctx.config.extraction);
    let text = extractor.extract(&upload).await?;
    let note = extractor.summarize(&text).await?;
    println!("\n{}\n", note.content);

    let outcome = ctx.manager.record_note(ctx.provider.as_ref(), note).await;
    print_outcome(&outcome);
    Ok(())
}

/// Add a description of an image to the conversation
pub async fn describe(ctx: &mut AppContext, path: &Path) -> Result<()> {
    let upload = open_upload(ctx, path).await?;

    let note = Extractor::new(ctx.provider.as_ref(), &ctx.config.extraction)
        .describe(&upload)
        .await?;
    println!("\n{}\n", note.content);

    let outcome = ctx.manager.record_note(ctx.provider.as_ref(), note).await;
    print_outcome(&outcome);
    Ok(())
}

/// Transcribe a voice clip and send it as the next prompt
pub async fn transcribe(ctx: &mut AppContext, path: &Path) -> Result<()> {
    let upload = open_upload(ctx, path).await?;

    let spoken = Extractor::new(ctx.provider.as_ref(), &ctx.config.extraction)
        .transcribe(&upload)
        .await?;
    println!("{} {}", "You said:".cyan().bold(), spoken.content);

    ctx.ask(&spoken.content).await?;
    Ok(())
}

async fn one_shot(config: Config, resume: Option<&str>) -> Result<AppContext> {
    let mut ctx = AppContext::new(config, None)?;
    if let Some(id) = resume {
        ctx.resume(id)?;
    }
    Ok(ctx)
}

fn print_saved_as(ctx: &AppContext) {
    if let Some(id) = ctx.manager.current_identifier() {
        println!(
            "{} {}",
            "Conversation:".dimmed(),
            id.cyan()
        );
    }
}

/// Ask one question about a set of files
pub async fn run_analyze(
    config: Config,
    files: Vec<PathBuf>,
    prompt: String,
    resume: Option<String>,
) -> Result<()> {
    let mut ctx = one_shot(config, resume.as_deref()).await?;
    attach(&mut ctx, &files).await?;
    ctx.ask(&prompt).await?;
    print_saved_as(&ctx);
    Ok(())
}

/// Summarise one document into a new or resumed conversation
pub async fn run_summarize(config: Config, file: PathBuf, resume: Option<String>) -> Result<()> {
    let mut ctx = one_shot(config, resume.as_deref()).await?;
    summarize(&mut ctx, &file).await?;
    print_saved_as(&ctx);
    Ok(())
}

/// Describe one image into a new or resumed conversation
pub async fn run_describe(config: Config, image: PathBuf, resume: Option<String>) -> Result<()> {
    let mut ctx = one_shot(config, resume.as_deref()).await?;
    describe(&mut ctx, &image).await?;
    print_saved_as(&ctx);
    Ok(())
}

/// Transcribe one voice clip and answer it
pub async fn run_transcribe(config: Config, audio: PathBuf, resume: Option<String>) -> Result<()> {
    let mut ctx = one_shot(config, resume.as_deref()).await?;
    transcribe(&mut ctx, &audio).await?;
    print_saved_as(&ctx);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::extract::vision::fixtures;
    use crate::storage::SessionStore;
    use crate::test_utils::{create_test_file, temp_dir, ScriptedProvider};
    use crate::transcript::Role;
    use image::ImageFormat;

    fn context(provider: ScriptedProvider, dir: &tempfile::TempDir) -> AppContext {
        let store = SessionStore::new(dir.path().join("chats")).unwrap();
        AppContext::from_parts(Config::default(), Box::new(provider), store)
    }

    #[tokio::test]
    async fn test_attach_keeps_readable_files_and_reports_others() {
        let dir = temp_dir();
        let notes = create_test_file(&dir, "notes.txt", "quarterly numbers");
        let broken = create_test_file(&dir, "broken.docx", "not a zip");
        let mut ctx = context(ScriptedProvider::new(), &dir);

        attach(&mut ctx, &[notes, broken]).await.unwrap();

        let context = ctx.attached.as_deref().unwrap();
        assert!(context.contains("notes.txt"));
        assert!(context.contains("quarterly numbers"));
        assert!(!context.contains("broken.docx"));
    }

    #[tokio::test]
    async fn test_attach_fails_when_nothing_readable() {
        let dir = temp_dir();
        let missing = dir.path().join("missing.pdf");
        let mut ctx = context(ScriptedProvider::new(), &dir);

        assert!(attach(&mut ctx, &[missing]).await.is_err());
        assert!(ctx.attached.is_none());
    }

    #[tokio::test]
    async fn test_summarize_appends_prefixed_note_and_saves() {
        let dir = temp_dir();
        let doc = create_test_file(&dir, "plan.md", "Ship the release on Friday.");
        let provider = ScriptedProvider::new()
            .with_reply(Ok("- Release ships Friday"))
            .with_title(Ok("Release Plan"));
        let mut ctx = context(provider, &dir);

        summarize(&mut ctx, &doc).await.unwrap();

        let messages = ctx.manager.transcript().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert!(messages[0].content.starts_with("Document Summary:"));
        assert!(ctx.manager.current_identifier().is_some());
    }

    #[tokio::test]
    async fn test_summarize_rejects_images() {
        let dir = temp_dir();
        let png = create_test_file(&dir, "pic.png", fixtures::encoded(ImageFormat::Png));
        let mut ctx = context(ScriptedProvider::new(), &dir);

        let err = summarize(&mut ctx, &png).await.unwrap_err();
        assert!(err.to_string().contains("not a document"));
    }

    #[tokio::test]
    async fn test_describe_appends_image_analysis() {
        let dir = temp_dir();
        let png = create_test_file(&dir, "pic.png", fixtures::encoded(ImageFormat::Png));
        let provider = ScriptedProvider::new().with_description(Ok("A red square."));
        let mut ctx = context(provider, &dir);

        describe(&mut ctx, &png).await.unwrap();

        let messages = ctx.manager.transcript().messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("Image Analysis:"));
        assert!(messages[0].content.contains("A red square."));
    }

    #[tokio::test]
    async fn test_transcribe_sends_spoken_text_as_prompt() {
        let dir = temp_dir();
        let clip = create_test_file(&dir, "memo.wav", b"RIFF....WAVEfmt ");
        let provider = ScriptedProvider::new()
            .with_transcription(Ok("What time is it?"))
            .with_reply(Ok("Noon."))
            .with_title(Ok("Time Question"));
        let mut ctx = context(provider, &dir);

        transcribe(&mut ctx, &clip).await.unwrap();

        let messages = ctx.manager.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What time is it?");
        assert_eq!(messages[1].content, "Noon.");
    }

    #[tokio::test]
    async fn test_transcribe_failure_leaves_transcript_untouched() {
        let dir = temp_dir();
        let clip = create_test_file(&dir, "memo.wav", b"RIFF....WAVEfmt ");
        let provider = ScriptedProvider::new()
            .with_transcription(Err(GatewayError::RateLimited("slow down".into())));
        let mut ctx = context(provider, &dir);

        assert!(transcribe(&mut ctx, &clip).await.is_err());
        assert!(ctx.manager.transcript().is_empty());
    }
}
