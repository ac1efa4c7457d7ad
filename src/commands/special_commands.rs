//! Special commands parser for interactive chat mode
//!
//! Special commands manage saved conversations, attach files and show
//! status without being sent to the model. Commands are prefixed with `/`;
//! the command word is case-insensitive, its arguments are kept verbatim.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },

    /// A quoted argument was not closed
    #[error("Unterminated quote in arguments to {0}")]
    UnterminatedQuote(String),
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new, unsaved conversation
    New,

    /// List saved conversations
    List,

    /// Load a saved conversation by identifier
    Switch(String),

    /// Delete the current conversation
    Delete,

    /// Admin-gated delete of the current conversation
    Clear(Option<String>),

    /// Extract files and send them as context with following messages
    Attach(Vec<PathBuf>),

    /// Drop attached context
    Detach,

    /// Summarise a document into the conversation
    Summarize(PathBuf),

    /// Describe an image into the conversation
    Image(PathBuf),

    /// Transcribe a voice clip into the conversation
    Transcribe(PathBuf),

    /// Show the current conversation and configuration
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command; send the input to the model
    None,
}

/// Split arguments on whitespace, honouring double quotes
fn split_args(command: &str, rest: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for c in rest.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if quoted {
        return Err(CommandError::UnterminatedQuote(command.to_string()));
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

fn single_path(command: &str, usage: &str, rest: &str) -> Result<PathBuf, CommandError> {
    let mut args = split_args(command, rest)?;
    match args.len() {
        0 => Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        }),
        1 => Ok(PathBuf::from(args.remove(0))),
        _ => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: args[1..].join(" "),
        }),
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use confab::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(
///     parse_special_command("/switch Basic Arithmetic Question").unwrap(),
///     SpecialCommand::Switch("Basic Arithmetic Question".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    let no_args = |command: SpecialCommand| {
        if rest.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::UnsupportedArgument {
                command: word.clone(),
                arg: rest.to_string(),
            })
        }
    };

    match word.as_str() {
        "/new" => no_args(SpecialCommand::New),
        "/list" | "/history" => no_args(SpecialCommand::List),
        "/delete" => no_args(SpecialCommand::Delete),
        "/detach" => no_args(SpecialCommand::Detach),
        "/status" => no_args(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        "/switch" | "/open" => {
            if rest.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/switch".to_string(),
                    usage: "/switch <conversation id>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Switch(rest.trim_matches('"').to_string()))
            }
        }

        "/clear" => Ok(SpecialCommand::Clear(
            (!rest.is_empty()).then(|| rest.to_string()),
        )),

        "/attach" => {
            let files = split_args("/attach", rest)?;
            if files.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/attach".to_string(),
                    usage: "/attach <file> [file ...]".to_string(),
                })
            } else {
                Ok(SpecialCommand::Attach(
                    files.into_iter().map(PathBuf::from).collect(),
                ))
            }
        }

        "/summarize" | "/summarise" => {
            single_path("/summarize", "/summarize <document>", rest).map(SpecialCommand::Summarize)
        }
        "/image" => single_path("/image", "/image <image file>", rest).map(SpecialCommand::Image),
        "/transcribe" => single_path("/transcribe", "/transcribe <audio file>", rest)
            .map(SpecialCommand::Transcribe),

        _ => Err(CommandError::UnknownCommand(word.clone())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

CONVERSATIONS:
  /new                  - Start a new conversation (saved ones are kept)
  /list                 - List saved conversations
  /switch <id>          - Open a saved conversation
  /delete               - Delete the current conversation
  /clear [password]     - Delete the current conversation (admin password if configured)

ATTACHMENTS:
  /attach <files...>    - Read files and send their content with your next messages
  /detach               - Stop sending attached content
  /summarize <file>     - Add a bullet-point summary of a document
  /image <file>         - Add a description of an image
  /transcribe <file>    - Add the transcription of a voice clip as your message

SESSION:
  /status               - Show the current conversation and settings
  /help                 - Show this help message
  /exit                 - Leave (also: exit, quit, Ctrl-D)

NOTES:
  - Supported documents: pdf, docx, pptx, csv, xlsx, txt, md
  - Quote paths that contain spaces: /attach "Q3 report.pdf"
  - A conversation is saved after its first reply and named from its content
"#
    );
}
