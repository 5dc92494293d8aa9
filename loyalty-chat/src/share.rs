//! Host capabilities for sharing and copying messages.
//!
//! Hosts plug in whatever they have. When sharing is unavailable or fails,
//! the message is copied to the clipboard instead.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{Capability, ChatError, Result};
use crate::export::clipboard_text;
use crate::models::Message;

pub const SHARE_TITLE: &str = "Shared from Chat";
pub const DEFAULT_SHARE_TEXT: &str = "Shared message from chatbot";

/// What a share sheet receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
}

impl SharePayload {
    pub fn for_message(message: &Message) -> Self {
        let text = message
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_SHARE_TEXT);
        Self {
            title: SHARE_TITLE.to_string(),
            text: text.to_string(),
        }
    }
}

/// Native share sheet.
pub trait ShareTarget: Send + Sync {
    fn share(&self, payload: &SharePayload) -> Result<()>;
}

/// System clipboard.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<()>;
}

/// A host with neither capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl ShareTarget for Unsupported {
    fn share(&self, _payload: &SharePayload) -> Result<()> {
        Err(ChatError::Unsupported(Capability::Share))
    }
}

impl Clipboard for Unsupported {
    fn copy(&self, _text: &str) -> Result<()> {
        Err(ChatError::Unsupported(Capability::Clipboard))
    }
}

/// Clipboard that keeps the last copied text in memory.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last copied text.
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}

/// How a share request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
    Failed,
}

/// Copy a message's text, metrics and table to the clipboard.
pub fn copy_message(message: &Message, clipboard: &dyn Clipboard) -> Result<()> {
    clipboard.copy(&clipboard_text(message))?;
    debug!(message_id = %message.id, "message copied");
    Ok(())
}

/// Share a message, falling back to the clipboard.
pub fn share_message(
    message: &Message,
    target: &dyn ShareTarget,
    clipboard: &dyn Clipboard,
) -> ShareOutcome {
    match target.share(&SharePayload::for_message(message)) {
        Ok(()) => return ShareOutcome::Shared,
        Err(ChatError::Unsupported(capability)) => {
            warn!(%capability, "sharing unavailable, copying instead");
        }
        Err(e) => warn!(error = %e, "share failed, copying instead"),
    }

    match copy_message(message, clipboard) {
        Ok(()) => ShareOutcome::Copied,
        Err(e) => {
            warn!(error = %e, message_id = %message.id, "copy failed");
            ShareOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingShare {
        shared: Mutex<Vec<SharePayload>>,
    }

    impl ShareTarget for RecordingShare {
        fn share(&self, payload: &SharePayload) -> Result<()> {
            self.shared.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    #[test]
    fn shares_when_supported() {
        let target = RecordingShare::default();
        let clipboard = MemoryClipboard::new();
        let outcome = share_message(&Message::assistant("hello"), &target, &clipboard);

        assert_eq!(outcome, ShareOutcome::Shared);
        let shared = target.shared.lock().unwrap();
        assert_eq!(shared[0].title, SHARE_TITLE);
        assert_eq!(shared[0].text, "hello");
        assert!(clipboard.contents().is_none());
    }

    #[test]
    fn falls_back_to_clipboard() {
        let clipboard = MemoryClipboard::new();
        let outcome = share_message(&Message::assistant("<b>hello</b>"), &Unsupported, &clipboard);
        assert_eq!(outcome, ShareOutcome::Copied);
        assert_eq!(clipboard.contents().as_deref(), Some("hello"));
    }

    #[test]
    fn reports_failure_without_any_capability() {
        let outcome = share_message(&Message::assistant("hello"), &Unsupported, &Unsupported);
        assert_eq!(outcome, ShareOutcome::Failed);
    }

    #[test]
    fn empty_text_uses_default() {
        let message = Message::new(crate::models::Sender::Assistant, None);
        assert_eq!(SharePayload::for_message(&message).text, DEFAULT_SHARE_TEXT);
    }
}
