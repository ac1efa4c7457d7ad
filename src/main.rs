//! Confab - conversational assistant with saved chats
//!
#![doc = "Confab - conversational assistant with saved chats"]
#![doc = "Main entry point for the Confab application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confab::cli::{Cli, Commands};
use confab::commands;
use confab::config::Config;
use confab::storage::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration; a missing API key stops here
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { model, resume } => {
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            if let Some(r) = &resume {
                tracing::debug!("Resuming conversation: {}", r);
            }

            commands::chat::run_chat(config, model, resume).await?;
            Ok(())
        }
        Commands::Analyze {
            files,
            prompt,
            resume,
        } => {
            tracing::info!("Analyzing {} file(s)", files.len());
            commands::files::run_analyze(config, files, prompt, resume).await?;
            Ok(())
        }
        Commands::Summarize { file, resume } => {
            tracing::info!("Summarizing {}", file.display());
            commands::files::run_summarize(config, file, resume).await?;
            Ok(())
        }
        Commands::Describe { image, resume } => {
            tracing::info!("Describing {}", image.display());
            commands::files::run_describe(config, image, resume).await?;
            Ok(())
        }
        Commands::Transcribe { audio, resume } => {
            tracing::info!("Transcribing {}", audio.display());
            commands::files::run_transcribe(config, audio, resume).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            let store = SessionStore::from_config(&config.storage)?;
            commands::history::handle_history(&store, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "confab=debug" } else { "confab=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
