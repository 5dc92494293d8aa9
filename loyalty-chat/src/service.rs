//! The chat session controller hosts drive.
//!
//! [`ChatService`] owns the message log, the session identity and the API
//! gateway. Hosts call its operations and render the snapshots it publishes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::{Agent, ChatGateway, ChatRequest, Model, UserRole};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::export::{
    account_ids_csv, export_filename, metrics_csv, table_csv, write_export, ExportKind, Report,
    ReportOptions, Transcript,
};
use crate::form::FormState;
use crate::models::{Attachment, FileUpload, FormCancellation, FormSubmission, Message};
use crate::session::{SessionManager, SessionStorage};
use crate::share::{self, Clipboard, ShareOutcome, ShareTarget};
use crate::store::{MessageStore, MessageSubscription};

/// Per-turn overrides. Unset fields fall back to [`ChatConfig`].
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    pub role: Option<UserRole>,
    pub model: Option<Model>,
    pub agent: Option<Agent>,
    pub file: Option<FileUpload>,
}

impl TurnOptions {
    #[must_use]
    pub fn with_file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }

    #[must_use]
    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agent = Some(agent);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }
}

/// Chat session controller.
///
/// Safe to share through an [`Arc`]: `send` calls from different tasks run
/// independently and their replies append in arrival order.
pub struct ChatService {
    config: ChatConfig,
    store: MessageStore,
    sessions: SessionManager,
    gateway: ChatGateway,
}

impl ChatService {
    /// Build a service from configuration.
    pub fn new(config: ChatConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        config.validate()?;
        let gateway = ChatGateway::new(&config.api_url, config.request_timeout)?;
        Ok(Self::with_gateway(config, storage, gateway))
    }

    /// Build a service around an existing gateway.
    pub fn with_gateway(
        config: ChatConfig,
        storage: Arc<dyn SessionStorage>,
        gateway: ChatGateway,
    ) -> Self {
        if let Some(token) = &config.auth_token {
            gateway.update_auth_token(token);
        }
        Self {
            config,
            store: MessageStore::new(),
            sessions: SessionManager::new(storage),
            gateway,
        }
    }

    pub const fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Id sent as `userId` with every call.
    pub fn session_id(&self) -> String {
        self.sessions.get_id()
    }

    /// Receive a snapshot of the log now and after every change.
    pub fn subscribe(&self) -> MessageSubscription {
        self.store.subscribe()
    }

    pub fn get_current_messages(&self) -> Vec<Message> {
        self.store.snapshot()
    }

    pub fn update_api_url(&self, base_url: &str) {
        self.gateway.update_api_url(base_url);
    }

    pub fn update_auth_token(&self, token: &str) {
        self.gateway.update_auth_token(token);
    }

    pub fn api_url(&self) -> String {
        self.gateway.api_url()
    }

    /// Send a user message and wait for the reply.
    ///
    /// The user message is appended immediately; the reply (or an apology on
    /// failure) is appended when the call finishes and also returned.
    pub async fn send(&self, text: &str, options: TurnOptions) -> Message {
        self.store.clear_assistant_suggestions();

        let attachments = options
            .file
            .as_ref()
            .map(Attachment::from_upload)
            .into_iter()
            .collect();
        self.store
            .append(Message::user(text).with_attachments(attachments));

        self.run_turn(text, options, None).await
    }

    /// Send a suggestion as if the user typed it. The suggestions on
    /// `message_id` are cleared first.
    pub async fn click_suggestion(&self, message_id: &str, suggestion: &str) -> Message {
        self.store.clear_suggestions(message_id);
        self.send(suggestion, TurnOptions::default()).await
    }

    /// Ask for a fresh answer to the user message before `message_id`.
    ///
    /// Returns `None` when that message is not preceded by a user message.
    pub async fn regenerate(&self, message_id: &str) -> Option<Message> {
        let previous = self.store.preceding(message_id).filter(Message::is_user)?;
        let text = previous.text.unwrap_or_default();
        debug!(%message_id, "regenerating reply");
        Some(self.run_turn(&text, TurnOptions::default(), None).await)
    }

    /// Submit the form shown on `message_id`.
    ///
    /// A valid form is echoed as a user message, hidden and sent to the API
    /// with its data. An invalid form only marks its fields touched.
    pub async fn submit_form(&self, message_id: &str, state: &mut FormState) -> Option<Message> {
        let submission = state.submit();
        if !submission.is_valid {
            let err = ChatError::Validation {
                form_id: submission.form_id,
            };
            warn!(error = %err, kind = err.kind(), "form not submitted");
            return None;
        }

        self.store.append(Message::user(format!(
            "Form \"{}\" submitted successfully",
            submission.form_id
        )));
        self.store.hide_form(message_id);

        let text = format!(
            "Form submission: {}",
            serde_json::Value::Object(submission.data.clone())
        );
        Some(
            self.run_turn(&text, TurnOptions::default(), Some(submission))
                .await,
        )
    }

    /// Dismiss the form shown on `message_id`.
    pub fn cancel_form(&self, message_id: &str, state: &FormState) -> FormCancellation {
        self.store.hide_form(message_id);
        debug!(form_id = %state.form_id(), "form cancelled");
        state.cancel()
    }

    /// Forget the conversation and start over with a new session id.
    ///
    /// Clearing the server side is best effort; the local reset always happens.
    pub async fn start_new_chat(&self) -> String {
        let old_id = self.sessions.get_id();
        if let Err(e) = self.gateway.clear_remote_context(&old_id).await {
            warn!(error = %e, kind = e.kind(), session_id = %old_id, "failed to clear remote chat");
        }

        self.store.reset();
        let new_id = self.sessions.reset_id();
        info!(session_id = %new_id, "started new chat");
        new_id
    }

    /// Call once at startup. Starts a new chat if the previous run marked
    /// itself as unloading. Returns whether it did.
    pub async fn handle_page_load(&self) -> bool {
        if self.sessions.take_reload_flag() {
            self.start_new_chat().await;
            true
        } else {
            false
        }
    }

    /// Call before shutting down so the next start begins a fresh chat.
    pub fn mark_unloading(&self) {
        self.sessions.mark_unloading();
    }

    /// Share a message, falling back to copying it.
    pub fn share_message(
        &self,
        message_id: &str,
        target: &dyn ShareTarget,
        clipboard: &dyn Clipboard,
    ) -> Option<ShareOutcome> {
        let message = self.store.get(message_id)?;
        Some(share::share_message(&message, target, clipboard))
    }

    /// Copy a message's contents to the clipboard.
    pub fn copy_message(&self, message_id: &str, clipboard: &dyn Clipboard) -> Result<()> {
        let message = self.message(message_id)?;
        share::copy_message(&message, clipboard)
    }

    /// Render an export and write it to the configured export directory.
    ///
    /// Per-message exports need `message_id`.
    pub fn export(&self, kind: ExportKind, message_id: Option<&str>) -> Result<PathBuf> {
        let now = Utc::now();
        let (contents, id) = if kind.is_per_message() {
            let id = message_id
                .ok_or_else(|| ChatError::Export(format!("{kind} export needs a message id")))?;
            (self.render_message_export(kind, id)?, id)
        } else {
            (self.render_chat_export(kind, now)?, "")
        };

        let name = export_filename(kind, id, now);
        write_export(&self.config.export_dir, &name, &contents)
    }

    fn render_chat_export(&self, kind: ExportKind, now: chrono::DateTime<Utc>) -> Result<String> {
        let messages = self.store.snapshot();
        let username = self.config.username.as_deref();
        match kind {
            ExportKind::Transcript => {
                Transcript::build(&messages, &self.config.title, username, now).to_json()
            }
            _ => {
                let options = ReportOptions {
                    username: username.map(str::to_string),
                    ..ReportOptions::default()
                };
                Ok(Report::build(&messages, &options, now).render())
            }
        }
    }

    fn render_message_export(&self, kind: ExportKind, message_id: &str) -> Result<String> {
        let message = self.message(message_id)?;
        let missing = |what: &str| ChatError::Export(format!("message {message_id} has no {what}"));

        match kind {
            ExportKind::Metrics => {
                let metrics = message.metrics.as_ref().filter(|m| !m.is_empty());
                metrics_csv(metrics.ok_or_else(|| missing("metrics"))?)
            }
            ExportKind::Table => {
                table_csv(message.table_data.as_ref().ok_or_else(|| missing("table"))?)
            }
            _ => {
                let ids = message
                    .table_data
                    .as_ref()
                    .map(crate::models::TableData::account_ids)
                    .unwrap_or_default();
                if ids.is_empty() {
                    return Err(missing("account ids"));
                }
                account_ids_csv(&ids)
            }
        }
    }

    fn message(&self, message_id: &str) -> Result<Message> {
        self.store
            .get(message_id)
            .ok_or_else(|| ChatError::Export(format!("no message with id {message_id}")))
    }

    async fn run_turn(
        &self,
        text: &str,
        options: TurnOptions,
        form_submission: Option<FormSubmission>,
    ) -> Message {
        let request = ChatRequest {
            user_message: text.to_string(),
            user_role: options.role.unwrap_or(self.config.role),
            file: options.file,
            agent: options.agent.unwrap_or(self.config.agent),
            user_id: self.sessions.get_id(),
            model: options.model.unwrap_or(self.config.model),
            form_submission,
        };

        let reply = self.gateway.send(&request).await;
        self.store.append(reply.clone());
        reply
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("api_url", &self.gateway.api_url())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
