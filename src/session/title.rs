//! Conversation title derivation
//!
//! A title is requested once per session from the gateway and turned into a
//! storage-safe identifier. Any failure yields the fallback identifier.

use crate::error::GatewayError;
use crate::providers::Provider;
use crate::storage::validate_identifier;
use crate::transcript::{Message, Transcript};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Instruction sent ahead of the conversation excerpt
pub const TITLE_PROMPT: &str = "Write a short title of at most six words for the following \
conversation. Reply with the title only.";

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 60;

/// Messages from the start of the conversation sent for titling
const TITLE_CONTEXT_MESSAGES: usize = 4;

#[derive(Debug, Error)]
enum TitleError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("no usable title in reply {0:?}")]
    Unusable(String),
}

/// Ask `gateway` for a title, falling back to `fallback` on any failure
pub async fn derive_title(gateway: &dyn Provider, transcript: &Transcript, fallback: &str) -> String {
    match request_title(gateway, transcript).await {
        Ok(title) => {
            tracing::debug!("Derived title {:?}", title);
            title
        }
        Err(e) => {
            tracing::warn!("Title derivation failed, keeping {}: {}", fallback, e);
            fallback.to_string()
        }
    }
}

async fn request_title(gateway: &dyn Provider, transcript: &Transcript) -> Result<String, TitleError> {
    let mut request = vec![Message::system(TITLE_PROMPT)];
    request.extend(transcript.render().take(TITLE_CONTEXT_MESSAGES).cloned());

    let response = gateway.complete_title(&request).await?;
    let raw = response.message.content;
    sanitize_title(&raw).ok_or(TitleError::Unusable(raw))
}

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Turn a model reply into a storage-safe identifier
///
/// Returns `None` when nothing usable is left.
///
/// # Examples
///
/// ```
/// use confab::session::title::sanitize_title;
///
/// assert_eq!(
///     sanitize_title("\"Basic Arithmetic Question\"").as_deref(),
///     Some("Basic Arithmetic Question")
/// );
/// assert_eq!(sanitize_title("Q/A: 2+2?").as_deref(), Some("QA 2+2"));
/// assert_eq!(sanitize_title("  \n "), None);
/// ```
pub fn sanitize_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;

    let line = match line.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("title:") => &line[6..],
        _ => line,
    };

    let stripped = illegal_chars().replace_all(line, "");
    let collapsed = whitespace_runs().replace_all(&stripped, " ");
    let trimmed = collapsed.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '\'' | '`' | '*' | '#' | '.' | '“' | '”' | '‘' | '’')
    });

    let truncated: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    let title = truncated.trim_end().trim_end_matches('.').trim_end().to_string();

    if validate_identifier(&title).is_ok() {
        Some(title)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedProvider;

    #[test]
    fn test_sanitize_strips_quotes_and_prefix() {
        assert_eq!(
            sanitize_title("Title: \"Trip Planning\"").as_deref(),
            Some("Trip Planning")
        );
        assert_eq!(sanitize_title("**Rust Lifetimes**").as_deref(), Some("Rust Lifetimes"));
    }

    #[test]
    fn test_sanitize_removes_filename_illegal_characters() {
        assert_eq!(
            sanitize_title("C:\\Users/<admin>|what?*").as_deref(),
            Some("CUsersadminwhat")
        );
    }

    #[test]
    fn test_sanitize_uses_first_nonempty_line() {
        assert_eq!(
            sanitize_title("\n\nBudget Review\nSecond line").as_deref(),
            Some("Budget Review")
        );
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        assert_eq!(
            sanitize_title("Too \t  many   spaces").as_deref(),
            Some("Too many spaces")
        );
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let title = sanitize_title(&long).unwrap();
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_sanitize_rejects_dot_leading_and_empty() {
        assert_eq!(sanitize_title("..."), None);
        assert_eq!(sanitize_title("\"\""), None);
        assert_eq!(sanitize_title("/////"), None);
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_title("Café Menu 🍰").as_deref(), Some("Café Menu 🍰"));
    }

    #[tokio::test]
    async fn test_derive_title_uses_gateway_reply() {
        let gateway = ScriptedProvider::new().with_title(Ok("Basic Arithmetic Question"));
        let transcript =
            Transcript::from(vec![Message::user("What is 2+2?"), Message::assistant("4")]);
        let title = derive_title(&gateway, &transcript, "2024-01-01_12-00-00").await;
        assert_eq!(title, "Basic Arithmetic Question");

        let requests = gateway.title_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0], Message::system(TITLE_PROMPT));
        assert_eq!(requests[0][1], Message::user("What is 2+2?"));
    }

    #[tokio::test]
    async fn test_derive_title_sends_only_opening_messages() {
        let gateway = ScriptedProvider::new().with_title(Ok("Long Chat"));
        let transcript = Transcript::from(
            (0..10)
                .map(|i| Message::user(format!("m{}", i)))
                .collect::<Vec<_>>(),
        );
        derive_title(&gateway, &transcript, "fallback").await;
        assert_eq!(gateway.title_requests()[0].len(), 1 + TITLE_CONTEXT_MESSAGES);
    }

    #[tokio::test]
    async fn test_derive_title_falls_back_on_gateway_error() {
        let gateway = ScriptedProvider::new().with_title(Err(GatewayError::Timeout));
        let transcript = Transcript::from(vec![Message::user("hi")]);
        let title = derive_title(&gateway, &transcript, "2024-01-01_12-00-00").await;
        assert_eq!(title, "2024-01-01_12-00-00");
    }

    #[tokio::test]
    async fn test_derive_title_falls_back_on_unusable_reply() {
        let gateway = ScriptedProvider::new().with_title(Ok("???"));
        let transcript = Transcript::from(vec![Message::user("hi")]);
        let title = derive_title(&gateway, &transcript, "fallback-id").await;
        assert_eq!(title, "fallback-id");
    }
}
