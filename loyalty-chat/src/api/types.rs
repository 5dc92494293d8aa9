//! Wire types for the chat API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::models::{
    migrate_metrics, ChatForm, FileUpload, FormSubmission, Message, Sender, TableData,
};

/// Role of the person chatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    #[default]
    Regular,
}

impl UserRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Regular => "Regular",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "regular" => Some(Self::Regular),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model backing the assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Model {
    #[default]
    OpenAI,
    Gemini,
}

impl Model {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Gemini => "Gemini",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Specialized assistant agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agent {
    #[default]
    #[serde(rename = "Audience Builder")]
    AudienceBuilder,
    #[serde(rename = "Loyalty Builder")]
    LoyaltyBuilder,
    #[serde(rename = "Rewards Builder")]
    RewardsBuilder,
}

impl Agent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AudienceBuilder => "Audience Builder",
            Self::LoyaltyBuilder => "Loyalty Builder",
            Self::RewardsBuilder => "Rewards Builder",
        }
    }

    /// Parse an agent name; accepts `Audience Builder`, `audience-builder`, `audience`.
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.trim_end_matches("builder") {
            "audience" => Some(Self::AudienceBuilder),
            "loyalty" => Some(Self::LoyaltyBuilder),
            "rewards" | "reward" => Some(Self::RewardsBuilder),
            _ => None,
        }
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body of `POST /api/run-cortex-agent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_message: String,
    pub user_role: UserRole,
    pub file: Option<FileUpload>,
    pub agent: Agent,
    pub user_id: String,
    pub model: Model,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_submission: Option<FormSubmission>,
}

/// Body of `POST /api/clear_chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearChatRequest {
    /// Always the string `"True"`.
    pub clear: String,
    pub user_id: String,
}

impl ClearChatRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            clear: "True".to_string(),
            user_id: user_id.into(),
        }
    }
}

/// Assistant turn returned by the chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Either `{name: value}` or the legacy `[{name: value}]`.
    #[serde(default)]
    pub metrics_query: Option<Value>,
    /// Misspelled field some server versions send instead of `metricsQuery`.
    #[serde(default)]
    pub matrics_query: Option<Value>,
    /// Either `{headers, rows}` or a legacy bare list of account ids.
    #[serde(default)]
    pub table_data: Option<Value>,
    #[serde(default)]
    pub file_link: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub has_form: Option<bool>,
    /// Decoded lazily so a malformed form never costs the rest of the reply.
    #[serde(default)]
    pub form_data: Option<Value>,
}

impl ChatResponse {
    /// Build the assistant message this response describes.
    pub fn into_message(self) -> Message {
        let mut message = Message::new(Sender::Assistant, self.message);
        message.metrics = self
            .metrics_query
            .or(self.matrics_query)
            .and_then(migrate_metrics);
        message.table_data = self.table_data.and_then(migrate_table);
        message.file_link = self.file_link.filter(|l| !l.is_empty());
        message.suggestions = self.suggestions;
        if self.has_form != Some(false) {
            message.form = self.form_data.and_then(decode_form);
        }
        message
    }
}

fn decode_form(value: Value) -> Option<ChatForm> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<ChatForm>(value) {
        Ok(form) => Some(form),
        Err(e) => {
            warn!(error = %e, "Dropping form the assistant sent in an unknown shape");
            None
        }
    }
}

/// Convert a wire table into the canonical shape.
///
/// The legacy shape is a bare list of account ids; it becomes a single
/// `Account_ID` column.
pub fn migrate_table(value: Value) -> Option<TableData> {
    match value {
        Value::Object(_) => serde_json::from_value::<TableData>(value)
            .ok()
            .filter(|t| !t.headers.is_empty() || !t.rows.is_empty()),
        Value::Array(ids) if !ids.is_empty() => Some(TableData {
            headers: vec!["Account_ID".to_string()],
            rows: ids.into_iter().map(|id| vec![id]).collect(),
        }),
        _ => None,
    }
}
