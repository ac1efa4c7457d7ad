//! Session manager: the single current conversation and its lifecycle
//!
//! A conversation starts as an unsaved draft, is persisted under a
//! timestamp-derived provisional identifier after its first successful
//! exchange, and is renamed once to a title derived from its content.
//!
//! ```text
//! Empty --first exchange--> Provisional --title rename--> Titled
//!   ^                                                        |
//!   +-------------------- new / delete / clear --------------+
//! ```

pub mod title;

use crate::admin::AdminGate;
use crate::error::{ConfabError, StoreError, StoreResult};
use crate::providers::Provider;
use crate::storage::{SessionStore, StoredSession};
use crate::transcript::{Message, Transcript};
use chrono::{DateTime, Local};

/// Format of provisional identifiers
pub const PROVISIONAL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Suffix format used when a derived title is already taken
const TITLE_SUFFIX_FORMAT: &str = "%H%M%S";

const MAX_PROVISIONAL_ATTEMPTS: usize = 100;

/// Source of the current local time
pub type Clock = fn() -> DateTime<Local>;

/// Lifecycle state of the current conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing persisted yet
    Empty,
    /// Persisted under a timestamp-derived identifier
    Provisional,
    /// Persisted under its final identifier
    Titled,
}

/// A persisted conversation held in memory
#[derive(Debug, Clone)]
struct Session {
    identifier: String,
    transcript: Transcript,
    titled: bool,
    title_attempted: bool,
}

impl Session {
    fn provisional(identifier: String, transcript: Transcript) -> Self {
        Self {
            identifier,
            transcript,
            titled: false,
            title_attempted: false,
        }
    }

    fn loaded(identifier: String, transcript: Transcript) -> Self {
        Self {
            identifier,
            transcript,
            titled: true,
            title_attempted: true,
        }
    }
}

/// What happened to the conversation after a message was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    /// Assistant reply, when the action produced one
    pub reply: Option<Message>,
    /// Identifier of the current session after the action
    pub identifier: Option<String>,
    /// Whether the transcript reached durable storage
    pub saved: bool,
    /// Previous identifier when the session was renamed by this action
    pub renamed_from: Option<String>,
}

/// Owner of the current conversation
///
/// # Examples
///
/// ```
/// use confab::session::{SessionManager, SessionState};
/// use confab::storage::SessionStore;
///
/// let dir = tempfile::tempdir().unwrap();
/// let manager = SessionManager::new(SessionStore::new(dir.path()).unwrap());
/// assert_eq!(manager.state(), SessionState::Empty);
/// assert!(manager.transcript().is_empty());
/// ```
#[derive(Debug)]
pub struct SessionManager {
    store: SessionStore,
    current: Option<Session>,
    draft: Transcript,
    clock: Clock,
}

impl SessionManager {
    /// Create a manager with no current session
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            current: None,
            draft: Transcript::new(),
            clock: Local::now,
        }
    }

    /// Replace the clock used for provisional identifiers
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The backing store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        match &self.current {
            None => SessionState::Empty,
            Some(s) if s.titled => SessionState::Titled,
            Some(_) => SessionState::Provisional,
        }
    }

    /// Identifier of the current session, if it has been persisted
    pub fn current_identifier(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.identifier.as_str())
    }

    /// Transcript of the current conversation (the draft when Empty)
    pub fn transcript(&self) -> &Transcript {
        match &self.current {
            Some(session) => &session.transcript,
            None => &self.draft,
        }
    }

    fn transcript_mut(&mut self) -> &mut Transcript {
        match &mut self.current {
            Some(session) => &mut session.transcript,
            None => &mut self.draft,
        }
    }

    /// Drop the in-memory conversation and start over
    ///
    /// Persisted sessions are left untouched.
    pub fn new_conversation(&mut self) {
        if let Some(session) = self.current.take() {
            tracing::debug!("Leaving session {}", session.identifier);
        }
        self.draft = Transcript::new();
    }

    /// Load a stored session and make it current
    ///
    /// # Errors
    ///
    /// Propagates `NotFound` and `CorruptData` from the store; the current
    /// conversation is unchanged on failure.
    pub fn switch_to(&mut self, identifier: &str) -> StoreResult<()> {
        let transcript = self.store.load(identifier)?;
        tracing::info!(
            "Switched to session {} ({} messages)",
            identifier,
            transcript.len()
        );
        self.current = Some(Session::loaded(identifier.to_string(), transcript));
        self.draft = Transcript::new();
        Ok(())
    }

    /// All persisted sessions, most recent first
    pub fn list(&self) -> StoreResult<Vec<StoredSession>> {
        self.store.list()
    }

    /// Send `prompt` to the gateway and record the reply
    ///
    /// `context` is appended to the request as one system message but is not
    /// stored in the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`ConfabError::Gateway`] when the model call fails. The user
    /// message stays in the transcript and nothing is saved; calling again
    /// with the same prompt retries without duplicating it.
    pub async fn send_message(
        &mut self,
        gateway: &dyn Provider,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<ExchangeOutcome, ConfabError> {
        self.append_user_once(prompt);

        let mut request = self.transcript().messages().to_vec();
        if let Some(context) = context {
            request.push(Message::system(context));
        }

        let response = gateway.complete(&request).await.map_err(|e| {
            tracing::warn!("Gateway call failed: {}", e);
            ConfabError::Gateway(e)
        })?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                "Token usage: prompt={}, completion={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(self
            .record_exchange(gateway, prompt, &response.message.content)
            .await)
    }

    /// Append a completed user/assistant exchange and persist it
    ///
    /// `gateway` is only used for title derivation after the first exchange.
    pub async fn record_exchange(
        &mut self,
        gateway: &dyn Provider,
        user_text: &str,
        reply_text: &str,
    ) -> ExchangeOutcome {
        self.append_user_once(user_text);
        let reply = Message::assistant(reply_text);
        self.transcript_mut().append(reply.clone());

        let mut outcome = self.persist(gateway).await;
        outcome.reply = Some(reply);
        outcome
    }

    /// Append a single message produced outside a chat exchange and persist it
    pub async fn record_note(&mut self, gateway: &dyn Provider, message: Message) -> ExchangeOutcome {
        self.transcript_mut().append(message);
        self.persist(gateway).await
    }

    /// Delete the current session from storage and return to Empty
    ///
    /// # Errors
    ///
    /// `NoActiveSession` when nothing is persisted yet. Storage failures
    /// other than `NotFound` keep the session current.
    pub fn delete_current(&mut self) -> Result<String, ConfabError> {
        let session = self.current.take().ok_or(ConfabError::NoActiveSession)?;

        match self.store.delete(&session.identifier) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::debug!("Session {} was already gone", session.identifier);
            }
            Err(e) => {
                self.current = Some(session);
                return Err(e.into());
            }
        }

        tracing::info!("Deleted current session {}", session.identifier);
        self.draft = Transcript::new();
        Ok(session.identifier)
    }

    /// Delete a stored session by identifier
    ///
    /// Returns `false` when nothing was stored under `identifier`. Deleting
    /// the current session also clears it; a failed delete leaves it current.
    pub fn delete(&mut self, identifier: &str) -> StoreResult<bool> {
        let removed = match self.store.delete(identifier) {
            Ok(()) => true,
            Err(StoreError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };

        if self.current_identifier() == Some(identifier) {
            self.current = None;
            self.draft = Transcript::new();
        }
        Ok(removed)
    }

    /// Admin-gated removal of the current conversation
    ///
    /// A persisted session is deleted; an unsaved draft is discarded.
    pub fn clear_current(
        &mut self,
        gate: &AdminGate,
        password: Option<&str>,
    ) -> Result<(), ConfabError> {
        if !gate.verify(password) {
            tracing::warn!("Rejected clear request: wrong admin password");
            return Err(ConfabError::AdminDenied);
        }

        if self.current.is_some() {
            self.delete_current()?;
        } else {
            self.new_conversation();
        }
        Ok(())
    }

    fn append_user_once(&mut self, text: &str) {
        let transcript = self.transcript_mut();
        if transcript.pending_user_message() == Some(text) {
            tracing::debug!("Retrying pending user message");
            return;
        }
        transcript.append(Message::user(text));
    }

    async fn persist(&mut self, gateway: &dyn Provider) -> ExchangeOutcome {
        let result = if self.current.is_none() {
            self.create_provisional()
        } else {
            self.save_current()
        };

        let saved = match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save conversation: {}", e);
                false
            }
        };

        let renamed_from = if saved {
            self.derive_title_once(gateway).await
        } else {
            None
        };

        ExchangeOutcome {
            reply: None,
            identifier: self.current_identifier().map(str::to_string),
            saved,
            renamed_from,
        }
    }

    fn save_current(&self) -> StoreResult<()> {
        match &self.current {
            Some(session) => self.store.save(&session.identifier, &session.transcript),
            None => Ok(()),
        }
    }

    /// Persist the draft under a fresh provisional identifier
    fn create_provisional(&mut self) -> StoreResult<()> {
        let base = (self.clock)().format(PROVISIONAL_FORMAT).to_string();

        for attempt in 0..MAX_PROVISIONAL_ATTEMPTS {
            let candidate = match attempt {
                0 => base.clone(),
                n => format!("{}-{}", base, n + 1),
            };

            match self.store.create(&candidate, &self.draft) {
                Ok(()) => {
                    tracing::info!("Started session {}", candidate);
                    let transcript = std::mem::take(&mut self.draft);
                    self.current = Some(Session::provisional(candidate, transcript));
                    return Ok(());
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Conflict(base))
    }

    /// Rename a provisional session to its derived title
    ///
    /// Returns the old identifier when a rename happened.
    async fn derive_title_once(&mut self, gateway: &dyn Provider) -> Option<String> {
        let session = self.current.as_mut()?;
        if session.title_attempted || !session.transcript.has_user_message() {
            return None;
        }
        session.title_attempted = true;

        let provisional = session.identifier.clone();
        let title = title::derive_title(gateway, &session.transcript, &provisional).await;
        if title == provisional {
            session.titled = true;
            return None;
        }

        let target = match self.store.rename(&provisional, &title) {
            Ok(()) => title,
            Err(StoreError::Conflict(_)) => {
                let alternate = format!(
                    "{} {}",
                    title,
                    (self.clock)().format(TITLE_SUFFIX_FORMAT)
                );
                match self.store.rename(&provisional, &alternate) {
                    Ok(()) => alternate,
                    Err(e) => {
                        tracing::warn!("Keeping provisional identifier {}: {}", provisional, e);
                        return None;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Keeping provisional identifier {}: {}", provisional, e);
                return None;
            }
        };

        session.identifier = target;
        session.titled = true;
        Some(provisional)
    }
}
