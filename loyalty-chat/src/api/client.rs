//! HTTP gateway to the chat API.
//!
//! The gateway is stateless apart from its endpoint configuration: every call
//! snapshots the base URL and token when it starts, so changing them only
//! affects later calls.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::types::{ChatRequest, ChatResponse, ClearChatRequest};
use crate::error::{ChatError, Result};
use crate::models::Message;

/// Path of the chat endpoint.
pub const CHAT_PATH: &str = "/api/run-cortex-agent";
/// Path of the clear-context endpoint.
pub const CLEAR_CHAT_PATH: &str = "/api/clear_chat";

/// Reply appended when a chat call fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";
/// Suggestions offered with [`APOLOGY_MESSAGE`].
pub const RETRY_SUGGESTIONS: [&str; 3] = ["Try again", "Check connection", "Contact support"];

/// The message shown in place of a failed reply.
pub fn apology_message() -> Message {
    Message::assistant(APOLOGY_MESSAGE).with_suggestions(RETRY_SUGGESTIONS)
}

#[derive(Debug, Clone)]
struct Endpoints {
    base_url: String,
    auth_token: Option<String>,
}

impl Endpoints {
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Client for the chat and clear-context endpoints.
#[derive(Debug)]
pub struct ChatGateway {
    http: reqwest::Client,
    endpoints: RwLock<Endpoints>,
}

impl ChatGateway {
    /// Create a gateway for `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a gateway around an existing HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoints: RwLock::new(Endpoints {
                base_url: clean_base_url(base_url),
                auth_token: None,
            }),
        }
    }

    fn endpoints(&self) -> Endpoints {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point later calls at a new base URL. A trailing `/` is dropped.
    pub fn update_api_url(&self, base_url: &str) {
        let base_url = clean_base_url(base_url);
        debug!(%base_url, "API base URL updated");
        self.endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .base_url = base_url;
    }

    /// Set the bearer token sent with later calls. An empty token disables the header.
    pub fn update_auth_token(&self, token: &str) {
        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        self.endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .auth_token = (!token.is_empty()).then(|| token.to_string());
    }

    /// Current base URL.
    pub fn api_url(&self) -> String {
        self.endpoints().base_url
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        self.endpoints().url(CHAT_PATH)
    }

    /// Full URL of the clear-context endpoint.
    pub fn clear_chat_url(&self) -> String {
        self.endpoints().url(CLEAR_CHAT_PATH)
    }

    /// Post a chat turn and decode the reply.
    pub async fn post_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let endpoints = self.endpoints();
        self.post_json(&endpoints, CHAT_PATH, request).await
    }

    /// Run one chat turn and return the assistant message to append.
    ///
    /// Failures are logged and turned into [`apology_message`]; this never errors.
    pub async fn send(&self, request: &ChatRequest) -> Message {
        match self.post_chat(request).await {
            Ok(response) => response.into_message(),
            Err(e) => {
                log_failure(&e);
                apology_message()
            }
        }
    }

    /// Ask the server to forget the conversation for `session_id`.
    pub async fn clear_remote_context(&self, session_id: &str) -> Result<()> {
        let endpoints = self.endpoints();
        let url = endpoints.url(CLEAR_CHAT_PATH);
        let response = self
            .request(&endpoints, &url, &ClearChatRequest::new(session_id))
            .send()
            .await
            .map_err(ChatError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::from_status(status.as_u16(), &url));
        }
        debug!(%session_id, "remote chat context cleared");
        Ok(())
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        endpoints: &Endpoints,
        url: &str,
        body: &B,
    ) -> reqwest::RequestBuilder {
        let builder = self.http.post(url).json(body);
        match &endpoints.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post_json<B, T>(&self, endpoints: &Endpoints, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = endpoints.url(path);
        debug!(%url, "posting request");

        let response = self
            .request(endpoints, &url, body)
            .send()
            .await
            .map_err(ChatError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::from_status(status.as_u16(), &url));
        }

        response.json::<T>().await.map_err(ChatError::Decode)
    }
}

/// Log a failed chat call with its classification.
pub fn log_failure(err: &ChatError) {
    match err {
        ChatError::Network(e) => {
            error!(error = %e, kind = err.kind(), "network error - API server might be down");
        }
        ChatError::NotFound { url } => error!(%url, kind = err.kind(), "API endpoint not found"),
        ChatError::Server { status, url } => {
            error!(status, %url, kind = err.kind(), "server error");
        }
        ChatError::Status { status, url } => {
            error!(status, %url, kind = err.kind(), "API call failed");
        }
        other => warn!(error = %other, kind = other.kind(), "API call failed"),
    }
}

fn clean_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Agent, Model, UserRole};
    use crate::models::Sender;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> ChatGateway {
        ChatGateway::new(base_url, Duration::from_secs(5)).unwrap()
    }

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            user_message: text.into(),
            user_role: UserRole::Regular,
            file: None,
            agent: Agent::default(),
            user_id: "0000000001".into(),
            model: Model::default(),
            form_submission: None,
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let gateway = gateway("http://localhost:8001/");
        assert_eq!(gateway.chat_url(), "http://localhost:8001/api/run-cortex-agent");
        gateway.update_api_url("https://chat.example.com///");
        assert_eq!(gateway.clear_chat_url(), "https://chat.example.com/api/clear_chat");
    }

    #[tokio::test]
    async fn send_success_builds_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_json(json!({
                "userMessage": "hello",
                "userRole": "Regular",
                "file": null,
                "agent": "Audience Builder",
                "userId": "0000000001",
                "model": "OpenAI"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Hi there",
                "metricsQuery": {"totalMembers": 10},
                "suggestions": ["Next"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = gateway(&server.uri()).send(&request("hello")).await;
        assert_eq!(reply.sender, Sender::Assistant);
        assert_eq!(reply.text.as_deref(), Some("Hi there"));
        assert!(reply.metrics.is_some());
    }

    #[tokio::test]
    async fn server_error_becomes_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        let err = gateway.post_chat(&request("x")).await.unwrap_err();
        assert_eq!(err.kind(), "server");

        let reply = gateway.send(&request("x")).await;
        assert_eq!(reply.text.as_deref(), Some(APOLOGY_MESSAGE));
        assert_eq!(reply.suggestions.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn not_found_and_bad_body_are_classified() {
        let server = MockServer::start().await;
        let gateway = gateway(&server.uri());

        let err = gateway.post_chat(&request("x")).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let err = gateway.post_chat(&request("x")).await.unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let gateway = gateway("http://127.0.0.1:9");
        let err = gateway.post_chat(&request("x")).await.unwrap_err();
        assert_eq!(err.kind(), "network");
    }

    #[tokio::test]
    async fn auth_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CLEAR_CHAT_PATH))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"clear": "True", "userId": "0000000001"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server.uri());
        gateway.update_auth_token("Bearer secret");
        gateway.clear_remote_context("0000000001").await.unwrap();
    }

    #[tokio::test]
    async fn url_change_applies_to_next_call() {
        let old = MockServer::start().await;
        let new = MockServer::start().await;
        for server in [&old, &new] {
            Mock::given(method("POST"))
                .and(path(CHAT_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
                .expect(1)
                .mount(server)
                .await;
        }

        let gateway = gateway(&old.uri());
        gateway.send(&request("first")).await;
        gateway.update_api_url(&new.uri());
        gateway.send(&request("second")).await;
    }
}
