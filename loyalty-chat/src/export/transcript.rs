//! JSON transcript export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Attachment, Message, Metrics, Sender};

/// Label used for the assistant in transcripts.
pub const ASSISTANT_LABEL: &str = "Bonnie";
/// Label used for the user when no username is known.
pub const DEFAULT_USER_LABEL: &str = "User";

/// Which side of the conversation an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Bot,
}

impl From<Sender> for EntryKind {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Self::User,
            Sender::Assistant => Self::Bot,
        }
    }
}

/// One message in an exported transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: String,
    pub sender: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub metrics: Option<Metrics>,
    pub attachments: Option<Vec<Attachment>>,
}

/// An exported conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Build a transcript of `messages` in display order.
    pub fn build(
        messages: &[Message],
        title: &str,
        username: Option<&str>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let user_label = username
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_USER_LABEL);

        let messages = messages
            .iter()
            .map(|m| TranscriptEntry {
                id: m.id.clone(),
                sender: if m.is_user() { user_label } else { ASSISTANT_LABEL }.to_string(),
                message: m.text.clone().unwrap_or_default(),
                timestamp: m.timestamp,
                kind: m.sender.into(),
                metrics: m.metrics.clone(),
                attachments: m.attachments.clone(),
            })
            .collect();

        Self {
            title: title.to_string(),
            timestamp: generated_at,
            messages,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{migrate_metrics, FileUpload};
    use serde_json::json;

    fn conversation() -> Vec<Message> {
        let upload = FileUpload {
            name: "members.csv".into(),
            size: 2048,
        };
        let question = Message::user("How many members?")
            .with_attachments(vec![Attachment::from_upload(&upload)]);
        let mut answer = Message::assistant("There are <b>1,234</b> members.");
        answer.metrics = migrate_metrics(json!({"totalMembers": 1234}));
        vec![question, answer]
    }

    #[test]
    fn labels_and_kinds() {
        let messages = conversation();
        let transcript = Transcript::build(&messages, "Chat", Some("Ann"), Utc::now());
        assert_eq!(transcript.messages[0].sender, "Ann");
        assert_eq!(transcript.messages[0].kind, EntryKind::User);
        assert_eq!(transcript.messages[1].sender, ASSISTANT_LABEL);
        assert_eq!(transcript.messages[1].kind, EntryKind::Bot);

        let anonymous = Transcript::build(&messages, "Chat", None, Utc::now());
        assert_eq!(anonymous.messages[0].sender, DEFAULT_USER_LABEL);
    }

    #[test]
    fn absent_fields_are_null() {
        let messages = vec![Message::assistant("hi")];
        let transcript = Transcript::build(&messages, "Chat", None, Utc::now());
        let value: serde_json::Value = serde_json::from_str(&transcript.to_json().unwrap()).unwrap();
        let entry = &value["messages"][0];
        assert_eq!(entry["type"], "bot");
        assert!(entry["metrics"].is_null());
        assert!(entry["attachments"].is_null());
    }

    #[test]
    fn parse_keeps_text_timestamp_and_sender() {
        let messages = conversation();
        let transcript = Transcript::build(&messages, "Chat", Some("Ann"), Utc::now());
        let parsed = Transcript::parse(&transcript.to_json().unwrap()).unwrap();

        assert_eq!(parsed, transcript);
        for (entry, original) in parsed.messages.iter().zip(&messages) {
            assert_eq!(Some(&entry.message), original.text.as_ref());
            assert_eq!(entry.timestamp, original.timestamp);
        }
        assert_eq!(parsed.messages[1].metrics.as_ref().unwrap()["totalMembers"], json!(1234));
    }
}
