use crate::cli::HistoryCommand;
use crate::error::{Result, StoreError};
use crate::storage::{SessionStore, StoredSession};
use crate::transcript::{Role, Transcript};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(store: &SessionStore, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => {
            let sessions = store.list()?;
            print_session_table(store, &sessions, None);
            if !sessions.is_empty() {
                println!(
                    "Use {} to resume a conversation.",
                    "confab chat --resume <ID>".cyan()
                );
                println!();
            }
        }
        HistoryCommand::Show { id } => match store.load(&id) {
            Ok(transcript) => {
                println!("\n{}\n", id.bold());
                print_transcript(&transcript);
            }
            Err(StoreError::NotFound(_)) => {
                println!("{}", format!("No conversation named {}", id).yellow());
            }
            Err(e) => return Err(e.into()),
        },
        HistoryCommand::Delete { id } => match store.delete(&id) {
            Ok(()) => println!("{}", format!("Deleted conversation {}", id).green()),
            Err(StoreError::NotFound(_)) => {
                println!("{}", format!("No conversation named {}", id).yellow());
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}

/// Print saved conversations as a table, marking `current`
pub fn print_session_table(store: &SessionStore, sessions: &[StoredSession], current: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No saved conversations found.".yellow());
        return;
    }

    println!("\nSaved Conversations:");
    session_table(store, sessions, current).printstd();
    println!();
}

/// Identifiers are listed in full so they can be pasted into `/switch`
fn session_table(store: &SessionStore, sessions: &[StoredSession], current: Option<&str>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Messages".bold(),
        "Size".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        let marker = if current == Some(session.id.as_str()) {
            "*"
        } else {
            ""
        };
        let messages = match store.load(&session.id) {
            Ok(transcript) => transcript.len().to_string(),
            Err(StoreError::CorruptData { .. }) => "corrupt".red().to_string(),
            Err(_) => "-".to_string(),
        };
        let updated = session
            .updated_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            marker.green(),
            session.id.cyan(),
            messages,
            format!("{} B", session.size_bytes),
            updated
        ]);
    }
    table
}

/// Print every message of a transcript with a coloured role label
pub fn print_transcript(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("{}", "(no messages yet)".dimmed());
        return;
    }

    for message in transcript.render() {
        let label = match message.role {
            Role::User => "You".cyan().bold(),
            Role::Assistant => "Assistant".green().bold(),
            Role::System => "System".yellow().bold(),
        };
        println!("{}: {}\n", label, message.content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_dir;
    use crate::transcript::Message;

    fn store_with(ids: &[&str]) -> (SessionStore, tempfile::TempDir) {
        let dir = temp_dir();
        let store = SessionStore::new(dir.path()).unwrap();
        for id in ids {
            store
                .save(id, &Transcript::from(vec![Message::user("hi")]))
                .unwrap();
        }
        (store, dir)
    }

    #[test]
    fn test_long_identifiers_are_listed_in_full() {
        let long = format!("{} 123456", "Budget review ".repeat(5).trim_end());
        assert!(long.chars().count() > 60);
        let (store, _dir) = store_with(&[&long]);

        let rendered = session_table(&store, &store.list().unwrap(), Some(&long)).to_string();
        assert!(rendered.contains(&long));
        assert!(!rendered.contains("..."));
    }

    #[test]
    fn test_history_list_and_show() {
        let (store, _dir) = store_with(&["A", "B"]);
        handle_history(&store, HistoryCommand::List).unwrap();
        handle_history(&store, HistoryCommand::Show { id: "A".to_string() }).unwrap();
    }

    #[test]
    fn test_history_show_missing_is_not_an_error() {
        let (store, _dir) = store_with(&[]);
        handle_history(&store, HistoryCommand::Show { id: "nope".to_string() }).unwrap();
    }

    #[test]
    fn test_history_show_corrupt_is_an_error() {
        let (store, _dir) = store_with(&[]);
        std::fs::write(store.dir().join("bad.json"), "{").unwrap();
        assert!(handle_history(&store, HistoryCommand::Show { id: "bad".to_string() }).is_err());
    }

    #[test]
    fn test_history_delete() {
        let (store, _dir) = store_with(&["X"]);
        handle_history(&store, HistoryCommand::Delete { id: "X".to_string() }).unwrap();
        assert!(!store.exists("X"));
        // Second delete reports nothing to do
        handle_history(&store, HistoryCommand::Delete { id: "X".to_string() }).unwrap();
    }
}
