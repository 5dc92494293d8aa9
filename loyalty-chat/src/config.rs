//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::{Agent, Model, UserRole};
use crate::error::{ChatError, Result};

/// API server used when the host does not configure one.
pub const DEFAULT_API_URL: &str = "http://34.203.230.190:8001";
/// Chat title used in transcripts.
pub const DEFAULT_TITLE: &str = "Bonnie";
/// Upper bound on a single API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for a [`crate::ChatService`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL of the chat API, without a trailing `/`.
    pub api_url: String,
    /// Bearer token sent with every call.
    pub auth_token: Option<String>,
    /// Display name of the user in exports.
    pub username: Option<String>,
    pub title: String,
    pub role: UserRole,
    pub model: Model,
    pub agent: Agent,
    pub request_timeout: Duration,
    /// Where exports are written.
    pub export_dir: PathBuf,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            username: None,
            title: DEFAULT_TITLE.to_string(),
            role: UserRole::default(),
            model: Model::default(),
            agent: Agent::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            export_dir: PathBuf::from("."),
        }
    }
}

impl ChatConfig {
    /// Check that the API URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| ChatError::Config(format!("invalid API URL {:?}: {e}", self.api_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "API URL must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ChatError::Config("request timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.agent, Agent::AudienceBuilder);
        assert_eq!(config.model, Model::OpenAI);
        assert_eq!(config.role, UserRole::Regular);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        let mut config = ChatConfig {
            api_url: "not a url".into(),
            ..ChatConfig::default()
        };
        assert!(matches!(config.validate(), Err(ChatError::Config(_))));

        config.api_url = "ftp://example.com".into();
        assert!(matches!(config.validate(), Err(ChatError::Config(_))));
    }
}
