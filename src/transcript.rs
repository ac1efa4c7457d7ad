//! Role-tagged messages and the ordered transcript of one conversation
//!
//! A [`Transcript`] is append-only: messages are never reordered, edited or
//! removed once appended. Its persisted form is a JSON array of
//! `{role, content}` records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person typing
    User,
    /// The hosted model
    Assistant,
    /// Instructions or injected context
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::transcript::{Message, Role};
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Ordered sequence of messages belonging to one conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `message` to the end of the transcript
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Iterates messages in insertion order
    ///
    /// The iterator is `Clone`, so a renderer can walk it more than once.
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::transcript::{Message, Transcript};
    ///
    /// let mut t = Transcript::new();
    /// t.append(Message::user("a"));
    /// t.append(Message::assistant("b"));
    /// let view = t.render();
    /// assert_eq!(view.clone().count(), 2);
    /// assert_eq!(view.map(|m| m.content.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    /// ```
    pub fn render(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Borrow the messages as a slice
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no message has been appended
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recently appended message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True when at least one user message is present
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    /// The trailing user message, if nothing has answered it yet
    pub fn pending_user_message(&self) -> Option<&str> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => Some(m.content.as_str()),
            _ => None,
        }
    }

    /// Serialize to the persisted JSON form
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.messages)
    }

    /// Parse the persisted JSON form
    pub fn deserialize(data: &str) -> serde_json::Result<Self> {
        let messages: Vec<Message> = serde_json::from_str(data)?;
        Ok(Self { messages })
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_preserves_append_order() {
        let mut t = Transcript::new();
        for i in 0..10 {
            if i % 2 == 0 {
                t.append(Message::user(format!("q{}", i)));
            } else {
                t.append(Message::assistant(format!("a{}", i)));
            }
        }
        let contents: Vec<_> = t.render().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    format!("q{}", i)
                } else {
                    format!("a{}", i)
                }
            })
            .collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn test_render_is_restartable() {
        let t = Transcript::from(vec![Message::user("x"), Message::assistant("y")]);
        let first: Vec<_> = t.render().collect();
        let second: Vec<_> = t.render().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_roundtrip_with_unicode_and_empty_content() {
        let t = Transcript::from(vec![
            Message::system(""),
            Message::user("Grüße 🤖 — 日本語"),
            Message::assistant("line one\nline \"two\"\t\u{0}"),
        ]);
        let json = t.serialize().unwrap();
        assert_eq!(Transcript::deserialize(&json).unwrap(), t);
    }

    #[test]
    fn test_persisted_form_is_role_content_array() {
        let t = Transcript::from(vec![Message::user("What is 2+2?"), Message::assistant("4")]);
        let value: serde_json::Value = serde_json::from_str(&t.serialize().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"role": "user", "content": "What is 2+2?"},
                {"role": "assistant", "content": "4"}
            ])
        );
    }

    #[test]
    fn test_deserialize_rejects_unknown_role() {
        let data = r#"[{"role":"tool","content":"x"}]"#;
        assert!(Transcript::deserialize(data).is_err());
    }

    #[test]
    fn test_deserialize_rejects_non_array() {
        assert!(Transcript::deserialize(r#"{"role":"user"}"#).is_err());
        assert!(Transcript::deserialize("").is_err());
    }

    #[test]
    fn test_empty_transcript_roundtrip() {
        let t = Transcript::new();
        assert_eq!(t.serialize().unwrap(), "[]");
        assert!(Transcript::deserialize("[]").unwrap().is_empty());
    }

    #[test]
    fn test_pending_user_message() {
        let mut t = Transcript::new();
        assert_eq!(t.pending_user_message(), None);
        t.append(Message::user("hi"));
        assert_eq!(t.pending_user_message(), Some("hi"));
        t.append(Message::assistant("hello"));
        assert_eq!(t.pending_user_message(), None);
        assert!(t.has_user_message());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }
}
