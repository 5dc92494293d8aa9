//! Session model representing one chat conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat session, identified by a 10-digit numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Fixed-width numeric identifier sent to the API as `userId`.
    pub id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session.
    pub fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
        }
    }
}
