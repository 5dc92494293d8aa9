//! Error types for the chat client.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Host capabilities that may be missing at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Native share sheet.
    Share,
    /// System clipboard.
    Clipboard,
    /// Text-to-speech.
    Speech,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Share => "share",
            Self::Clipboard => "clipboard",
            Self::Speech => "speech",
        };
        write!(f, "{name}")
    }
}

/// Errors raised by the chat client.
///
/// Remote failures never reach the host through [`crate::ChatService::send`];
/// they are logged and turned into an assistant message. The variants still
/// exist so the gateway can classify what went wrong.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The endpoint does not exist.
    #[error("API endpoint not found: {url}")]
    NotFound { url: String },

    /// The server failed (status >= 500).
    #[error("server error {status} from {url}")]
    Server { status: u16, url: String },

    /// Any other non-success status.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    /// A form did not pass validation.
    #[error("form {form_id} failed validation")]
    Validation { form_id: String },

    /// A host capability is not available.
    #[error("{0} is not supported on this host")]
    Unsupported(Capability),

    /// Session storage could not be read or written.
    #[error("session storage error: {0}")]
    Storage(String),

    /// Invalid client configuration (URL, header value).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested export has nothing to export.
    #[error("cannot export: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ChatError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, url: &str) -> Self {
        match status {
            404 => Self::NotFound {
                url: url.to_string(),
            },
            s if s >= 500 => Self::Server {
                status: s,
                url: url.to_string(),
            },
            s => Self::Status {
                status: s,
                url: url.to_string(),
            },
        }
    }

    /// Short label used in log records.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::NotFound { .. } => "not_found",
            Self::Server { .. } => "server",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::Validation { .. } => "validation",
            Self::Unsupported(_) => "unsupported",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Export(_) => "export",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Csv(_) => "csv",
        }
    }
}
