//! Confab - conversational assistant library
//!
//! This library provides the core functionality of Confab: saved
//! conversations with a hosted language model, plus documents, images and
//! voice clips as conversation context.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `transcript`: Ordered, role-tagged messages of one conversation
//! - `storage`: One JSON file per saved conversation
//! - `session`: Current conversation lifecycle and automatic titling
//! - `providers`: Assistant gateway abstraction and the OpenAI implementation
//! - `extract`: Text from documents, spreadsheets, images and audio
//! - `admin`: Password gate for destructive controls
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use confab::providers::create_provider;
//! use confab::storage::SessionStore;
//! use confab::{Config, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider, None)?;
//!     let mut manager = SessionManager::new(SessionStore::from_config(&config.storage)?);
//!     let outcome = manager.send_message(provider.as_ref(), "What is 2+2?", None).await?;
//!     println!("saved as {:?}", outcome.identifier);
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod providers;
pub mod session;
pub mod storage;
pub mod transcript;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfabError, Result};
pub use session::SessionManager;
pub use transcript::{Message, Role, Transcript};

#[cfg(test)]
pub mod test_utils;
