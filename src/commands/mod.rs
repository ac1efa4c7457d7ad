/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`: Interactive chat mode with slash commands
- `files`: Attach, summarise, describe and transcribe files
- `history`: List, show and delete saved conversations

All handlers work on an [`AppContext`] holding the gateway and the current
conversation. Failures of a single action are printed and
never end an interactive session.
*/

use crate::admin::AdminGate;
use crate::config::Config;
use crate::error::Result;
use crate::error::ExtractionError;
use crate::providers::{create_provider, Provider};
use crate::session::{ExchangeOutcome, SessionManager};
use crate::storage::SessionStore;
use colored::Colorize;

// Special commands parser for the chat loop
pub mod special_commands;

// Saved conversation listing and maintenance
pub mod history;

// File-based actions shared by subcommands and slash commands
pub mod files;

/// Everything a command needs to act on the current conversation
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Assistant gateway
    pub provider: Box<dyn Provider>,
    /// Current conversation
    pub manager: SessionManager,
    /// Guard for destructive controls
    pub admin: AdminGate,
    /// Context message sent with every prompt until detached
    pub attached: Option<String>,
}

impl AppContext {
    /// Build the context from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider or the session store cannot be created
    pub fn new(config: Config, model_override: Option<&str>) -> Result<Self> {
        let provider = create_provider(&config.provider, model_override)?;
        let store = SessionStore::from_config(&config.storage)?;
        tracing::info!("Saving conversations in {}", store.dir().display());
        Ok(Self::from_parts(config, provider, store))
    }

    /// Assemble a context from already constructed parts
    pub fn from_parts(config: Config, provider: Box<dyn Provider>, store: SessionStore) -> Self {
        let admin = AdminGate::new(config.admin.password.as_deref());
        Self {
            config,
            provider,
            manager: SessionManager::new(store),
            admin,
            attached: None,
        }
    }

    /// Make a saved conversation current
    ///
    /// # Errors
    ///
    /// Returns error if the conversation does not exist or cannot be read
    pub fn resume(&mut self, id: &str) -> Result<()> {
        self.manager.switch_to(id)?;
        self.attached = None;
        Ok(())
    }

    /// Send a prompt with any attached context and print the reply
    ///
    /// # Errors
    ///
    /// Returns error when the gateway call fails; the prompt stays in the
    /// transcript so the user can retry.
    pub async fn ask(&mut self, prompt: &str) -> Result<ExchangeOutcome> {
        let outcome = self
            .manager
            .send_message(self.provider.as_ref(), prompt, self.attached.as_deref())
            .await?;
        print_outcome(&outcome);
        Ok(outcome)
    }
}

/// Print the reply of an exchange and any persistence notices
pub fn print_outcome(outcome: &ExchangeOutcome) {
    if let Some(reply) = &outcome.reply {
        println!("\n{}\n", reply.content);
    }
    if let Some(old) = &outcome.renamed_from {
        if let Some(new) = &outcome.identifier {
            tracing::debug!("Conversation {} is now {}", old, new);
            println!("{}", format!("Saved as \"{}\"", new).dimmed());
        }
    }
    if !outcome.saved {
        eprintln!(
            "{}",
            "Warning: the conversation could not be saved; it is kept in memory only.".yellow()
        );
    }
}

/// Print one line per file that could not be read
pub fn print_failures(failures: &[ExtractionError]) {
    for failure in failures {
        eprintln!("{}", format!("Skipped {}", failure).red());
    }
}

/// Print an action error without ending the session
pub fn print_error(error: &anyhow::Error) {
    eprintln!("{}", format!("Error: {:#}\n", error).red());
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Creates the gateway and session manager, optionally resumes a saved
    //! conversation, and runs a readline loop. Plain input is sent to the
    //! model; `/` commands manage conversations and attachments.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::error::ConfabError;
    use crate::session::SessionState;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `model` - Optional override for the configured chat model
    /// * `resume` - Optional saved conversation to open first
    pub async fn run_chat(config: Config, model: Option<String>, resume: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut ctx = AppContext::new(config, model.as_deref())?;

        if let Some(id) = resume.as_deref() {
            ctx.resume(id)?;
            super::history::print_transcript(ctx.manager.transcript());
        }

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&ctx);

        loop {
            let prompt = format_prompt(&ctx);
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    history_recorded(rl.add_history_entry(trimmed));

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    if command == SpecialCommand::Exit {
                        break;
                    }

                    if let Err(e) = handle_input(&mut ctx, command, trimmed).await {
                        print_error(&e);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Run one line of input
    pub(crate) async fn handle_input(
        ctx: &mut AppContext,
        command: SpecialCommand,
        input: &str,
    ) -> Result<()> {
        match command {
            SpecialCommand::None => {
                ctx.ask(input).await?;
            }
            SpecialCommand::New => {
                ctx.manager.new_conversation();
                ctx.attached = None;
                println!("{}\n", "Started a new conversation.".green());
            }
            SpecialCommand::List => {
                let sessions = ctx.manager.list()?;
                super::history::print_session_table(
                    ctx.manager.store(),
                    &sessions,
                    ctx.manager.current_identifier(),
                );
            }
            SpecialCommand::Switch(id) => {
                ctx.resume(&id).map_err(|e| {
                    anyhow::anyhow!("Unable to open this conversation ({}): {:#}", id, e)
                })?;
                println!("{}\n", format!("Opened \"{}\"", id).green());
                super::history::print_transcript(ctx.manager.transcript());
            }
            SpecialCommand::Delete => match ctx.manager.delete_current() {
                Ok(id) => {
                    ctx.attached = None;
                    println!("{}\n", format!("Deleted conversation \"{}\"", id).green());
                }
                Err(ConfabError::NoActiveSession) => {
                    ctx.manager.new_conversation();
                    println!("{}\n", "Nothing saved yet; started over.".yellow());
                }
                Err(e) => return Err(e.into()),
            },
            SpecialCommand::Clear(password) => {
                ctx.manager.clear_current(&ctx.admin, password.as_deref())?;
                ctx.attached = None;
                println!("{}\n", "Conversation cleared.".green());
            }
            SpecialCommand::Attach(paths) => {
                super::files::attach(ctx, &paths).await?;
            }
            SpecialCommand::Detach => {
                ctx.attached = None;
                println!("{}\n", "Attachments removed.".green());
            }
            SpecialCommand::Summarize(path) => super::files::summarize(ctx, &path).await?,
            SpecialCommand::Image(path) => super::files::describe(ctx, &path).await?,
            SpecialCommand::Transcribe(path) => super::files::transcribe(ctx, &path).await?,
            SpecialCommand::ShowStatus => print_status_display(ctx),
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit => {}
        }
        Ok(())
    }

    /// Log a failed history write instead of leaving the chat loop
    pub(super) fn history_recorded(result: rustyline::Result<bool>) -> bool {
        match result {
            Ok(added) => added,
            Err(e) => {
                tracing::warn!("Failed to record input history: {}", e);
                false
            }
        }
    }

    fn format_prompt(ctx: &AppContext) -> String {
        let label = match ctx.manager.current_identifier() {
            Some(id) => format!("[{}]", id),
            None => "[new]".to_string(),
        };
        let clip = if ctx.attached.is_some() { " +files" } else { "" };
        format!("{}{} >> ", label.cyan(), clip.magenta())
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(ctx: &AppContext) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Confab Interactive Chat - Welcome!              ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Model:  {}", ctx.provider.model().green());
        println!("Chats:  {}", ctx.manager.store().dir().display());
        println!("\nType '/help' for available commands, 'exit' to quit\n");
    }

    /// Display detailed status information about the current conversation
    fn print_status_display(ctx: &AppContext) {
        let state = match ctx.manager.state() {
            SessionState::Empty => "new (unsaved)".yellow(),
            SessionState::Provisional => "saved, untitled".cyan(),
            SessionState::Titled => "saved".green(),
        };

        println!("\n{}", "Conversation Status".bold());
        println!("  Identifier:  {}", ctx.manager.current_identifier().unwrap_or("-"));
        println!("  State:       {}", state);
        println!("  Messages:    {}", ctx.manager.transcript().len());
        println!("  Model:       {}", ctx.provider.model());
        println!(
            "  Attachments: {}",
            if ctx.attached.is_some() { "yes" } else { "none" }
        );
        println!(
            "  Admin lock:  {}",
            if ctx.admin.is_protected() { "on" } else { "off" }
        );
        println!("  Storage:     {}\n", ctx.manager.store().dir().display());
    }
}
