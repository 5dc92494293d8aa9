//! Message model representing one turn in the chat log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::form::ChatForm;
use super::metrics::Metrics;

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant.
    Assistant,
}

impl Sender {
    /// Convert sender to its wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse sender from a wire string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" | "bot" => Some(Self::Assistant),
            _ => None,
        }
    }

    pub const fn is_user(self) -> bool {
        matches!(self, Self::User)
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tabular result attached to an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Column headers, in display order.
    pub headers: Vec<String>,
    /// Rows of cells; cells are whatever JSON the server sent.
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    /// Index of the first column whose header mentions "account".
    pub fn account_column(&self) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.to_lowercase().contains("account"))
    }

    /// Non-empty values of the account column, if there is one.
    pub fn account_ids(&self) -> Vec<String> {
        let Some(idx) = self.account_column() else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .map(cell_text)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Render a table cell as plain text.
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Kind of file attached to a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    File,
    Csv,
    Excel,
}

/// File attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl Attachment {
    /// Describe an uploaded file. Anything that is not `.csv` is treated as a spreadsheet.
    pub fn from_upload(upload: &FileUpload) -> Self {
        let kind = if upload.name.to_lowercase().ends_with(".csv") {
            AttachmentKind::Csv
        } else {
            AttachmentKind::Excel
        };
        Self {
            name: upload.name.clone(),
            kind,
            url: None,
            size: Some(format_file_size(upload.size)),
        }
    }
}

/// A file the user picked to send along with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Human readable file size (`0 Bytes`, `1.5 KB`, `2 MB`).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// A message in the chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique, time-ordered identifier.
    pub id: String,
    /// Message text (may contain markup from the assistant).
    pub text: Option<String>,
    /// Who sent the message.
    pub sender: Sender,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Named facts returned with the answer.
    pub metrics: Option<Metrics>,
    /// Tabular result.
    pub table_data: Option<TableData>,
    /// Link to a downloadable report.
    pub file_link: Option<String>,
    /// Follow-up prompts offered to the user.
    pub suggestions: Option<Vec<String>>,
    /// Form the user is asked to fill in.
    pub form: Option<ChatForm>,
    /// Files the user sent.
    pub attachments: Option<Vec<Attachment>>,
}

impl Message {
    /// Create an empty message from `sender`.
    pub fn new(sender: Sender, text: Option<String>) -> Self {
        Self {
            id: generate_id(),
            text,
            sender,
            timestamp: Utc::now(),
            metrics: None,
            table_data: None,
            file_link: None,
            suggestions: None,
            form: None,
            attachments: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, Some(text.into()))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, Some(text.into()))
    }

    #[must_use]
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = Some(suggestions.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = (!attachments.is_empty()).then_some(attachments);
        self
    }

    pub const fn is_user(&self) -> bool {
        self.sender.is_user()
    }

    /// Whether the message currently shows a form.
    pub const fn has_form(&self) -> bool {
        self.form.is_some()
    }
}

/// Generate a UUIDv7 (time-ordered, globally unique).
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn sender_parses_bot_alias() {
        assert_eq!(Sender::from_str("bot"), Some(Sender::Assistant));
        assert_eq!(Sender::from_str("user"), Some(Sender::User));
        assert_eq!(Sender::from_str("robot"), None);
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn csv_upload_becomes_csv_attachment() {
        let upload = FileUpload {
            name: "members.CSV".into(),
            size: 2048,
        };
        let attachment = Attachment::from_upload(&upload);
        assert_eq!(attachment.kind, AttachmentKind::Csv);
        assert_eq!(attachment.size.as_deref(), Some("2 KB"));

        let upload = FileUpload {
            name: "members.xlsx".into(),
            size: 10,
        };
        assert_eq!(Attachment::from_upload(&upload).kind, AttachmentKind::Excel);
    }

    #[test]
    fn account_ids_from_table() {
        let table = TableData {
            headers: vec!["Name".into(), "Account ID".into()],
            rows: vec![
                vec![json!("Ann"), json!("A-1")],
                vec![json!("Bob"), json!(null)],
                vec![json!("Cy"), json!(42)],
            ],
        };
        assert_eq!(table.account_column(), Some(1));
        assert_eq!(table.account_ids(), vec!["A-1", "42"]);
    }

    #[test]
    fn table_without_account_column() {
        let table = TableData {
            headers: vec!["Name".into()],
            rows: vec![vec![json!("Ann")]],
        };
        assert!(table.account_ids().is_empty());
    }
}
