use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing entry for one persisted session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Identifier (file stem) of the session
    pub id: String,
    /// Last modification time of the session file
    pub updated_at: DateTime<Utc>,
    /// Size of the serialized transcript on disk
    pub size_bytes: u64,
}
