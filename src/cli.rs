//! Command-line interface definition for Confab
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Confab - conversational assistant with saved chats
///
/// Chat with a hosted language model, attach documents, images or voice
/// clips as context, and come back to earlier conversations.
#[derive(Parser, Debug, Clone)]
#[command(name = "confab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding saved conversations
    #[arg(long, env = "CONFAB_SESSION_DIR")]
    pub session_dir: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Confab
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive conversation
    Chat {
        /// Override the configured chat model
        #[arg(short, long)]
        model: Option<String>,

        /// Resume a saved conversation by identifier
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Ask a question about one or more files
    Analyze {
        /// Files to attach (pdf, docx, pptx, csv, xlsx, txt, images, audio)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Question to ask about the files
        #[arg(short, long, default_value = "Analyze the attached files.")]
        prompt: String,

        /// Append to a saved conversation instead of starting a new one
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Summarise a document into the conversation
    Summarize {
        /// Document to summarise
        file: PathBuf,

        /// Append to a saved conversation instead of starting a new one
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Describe an image into the conversation
    Describe {
        /// Image file (jpg, jpeg, png)
        image: PathBuf,

        /// Append to a saved conversation instead of starting a new one
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Transcribe a voice clip into the conversation
    Transcribe {
        /// Audio file (wav, mp3, m4a, ...)
        audio: PathBuf,

        /// Append to a saved conversation instead of starting a new one
        #[arg(short, long)]
        resume: Option<String>,
    },

    /// Manage saved conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Saved conversation subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    /// List saved conversations, most recent first
    List,

    /// Print a saved conversation
    Show {
        /// Conversation identifier
        id: String,
    },

    /// Delete a saved conversation
    Delete {
        /// Conversation identifier
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
