//! Message store: the ordered chat log and its subscribers.
//!
//! Every mutation publishes a full snapshot to each subscriber over its own
//! unbounded channel, so a subscriber sees every snapshot in emission order
//! and a slow subscriber never holds up the others.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::models::{Message, Sender};

/// Greeting seeded into an empty conversation.
pub const WELCOME_MESSAGE: &str = "Hello! I'm your AI assistant, Bonnie. What can I help you with?";

/// Suggestions offered with the greeting.
pub const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "What can you do for me?",
    "Suggest some segmentation strategies",
    "Suggest some audience building strategies",
];

/// The welcome message a conversation starts with.
pub fn welcome_message() -> Message {
    Message::assistant(WELCOME_MESSAGE).with_suggestions(DEFAULT_SUGGESTIONS)
}

struct Inner {
    messages: Vec<Message>,
    subscribers: Vec<mpsc::UnboundedSender<Vec<Message>>>,
}

impl Inner {
    fn emit(&mut self) {
        let snapshot = self.messages.clone();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

/// Append-only chat log.
///
/// Besides appending, only two partial mutations exist: clearing suggestions
/// on assistant messages and hiding a form once it was answered.
pub struct MessageStore {
    inner: Mutex<Inner>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Create a store holding only the welcome message.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                messages: vec![welcome_message()],
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message after everything currently in the log.
    pub fn append(&self, message: Message) {
        let mut inner = self.lock();
        debug!(id = %message.id, sender = %message.sender, "appending message");
        inner.messages.push(message);
        inner.emit();
    }

    /// Copy of the log in display order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// Look up a message by id.
    pub fn get(&self, id: &str) -> Option<Message> {
        self.lock().messages.iter().find(|m| m.id == id).cloned()
    }

    /// The message just before `id`, if any.
    pub fn preceding(&self, id: &str) -> Option<Message> {
        let inner = self.lock();
        let idx = inner.messages.iter().position(|m| m.id == id)?;
        idx.checked_sub(1).map(|prev| inner.messages[prev].clone())
    }

    /// Subscribe to snapshots. The current snapshot is delivered first.
    pub fn subscribe(&self) -> MessageSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // A fresh receiver cannot be closed yet.
        let _ = tx.send(inner.messages.clone());
        inner.subscribers.push(tx);
        MessageSubscription { rx }
    }

    /// Clear the log down to the welcome message.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.messages.clear();
        inner.messages.push(welcome_message());
        inner.emit();
    }

    /// Drop suggestions from every assistant message.
    pub fn clear_assistant_suggestions(&self) {
        let mut inner = self.lock();
        let mut changed = false;
        for message in &mut inner.messages {
            if message.sender == Sender::Assistant
                && message.suggestions.as_ref().is_some_and(|s| !s.is_empty())
            {
                message.suggestions = Some(Vec::new());
                changed = true;
            }
        }
        if changed {
            inner.emit();
        }
    }

    /// Drop suggestions from one assistant message. Returns false if the
    /// message does not exist or is not from the assistant.
    pub fn clear_suggestions(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let Some(message) = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.sender == Sender::Assistant)
        else {
            return false;
        };
        message.suggestions = Some(Vec::new());
        inner.emit();
        true
    }

    /// Remove the form from a message. Returns false if there was nothing to hide.
    pub fn hide_form(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let Some(message) = inner.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if message.form.take().is_none() {
            return false;
        }
        inner.emit();
        true
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MessageStore")
            .field("messages", &inner.messages.len())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

/// Receiving end of [`MessageStore::subscribe`].
#[derive(Debug)]
pub struct MessageSubscription {
    rx: mpsc::UnboundedReceiver<Vec<Message>>,
}

impl MessageSubscription {
    /// Wait for the next snapshot. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<Message>> {
        self.rx.recv().await
    }

    /// Next snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<Vec<Message>> {
        self.rx.try_recv().ok()
    }

    /// Adapt into a `Stream` of snapshots.
    pub fn into_stream(self) -> UnboundedReceiverStream<Vec<Message>> {
        UnboundedReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatForm, FieldKind, FormField};
    use tokio_stream::StreamExt;

    fn form() -> ChatForm {
        ChatForm {
            id: "f1".into(),
            title: "Form".into(),
            description: None,
            fields: vec![FormField::new("name", "Name", FieldKind::Text)],
            submit_label: None,
            cancel_label: None,
        }
    }

    #[test]
    fn new_store_has_welcome() {
        let store = MessageStore::new();
        let messages = store.snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Assistant);
        assert_eq!(messages[0].text.as_deref(), Some(WELCOME_MESSAGE));
    }

    #[test]
    fn reset_leaves_single_welcome() {
        let store = MessageStore::new();
        store.append(Message::user("hi"));
        store.append(Message::assistant("hello"));
        store.reset();

        let messages = store.snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Assistant);
        let suggestions = messages[0].suggestions.clone().unwrap();
        assert_eq!(suggestions, DEFAULT_SUGGESTIONS.map(String::from).to_vec());
    }

    #[test]
    fn append_keeps_order() {
        let store = MessageStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        let texts: Vec<_> = store
            .snapshot()
            .into_iter()
            .filter_map(|m| m.text)
            .collect();
        assert_eq!(texts[1..], ["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn len_counts_welcome() {
        let store = MessageStore::new();
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        store.append(Message::user("hi"));
        assert_eq!(store.len(), 2);
        store.reset();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_assistant_suggestions_leaves_users_alone() {
        let store = MessageStore::new();
        store.append(Message::user("u").with_suggestions(["keep"]));
        store.clear_assistant_suggestions();

        let messages = store.snapshot();
        assert_eq!(messages[0].suggestions.as_deref(), Some(&[][..]));
        assert_eq!(messages[1].suggestions.as_ref().unwrap(), &vec!["keep".to_string()]);
    }

    #[test]
    fn clear_suggestions_for_one_message() {
        let store = MessageStore::new();
        let reply = Message::assistant("a").with_suggestions(["x"]);
        let id = reply.id.clone();
        store.append(reply);

        assert!(store.clear_suggestions(&id));
        assert_eq!(store.get(&id).unwrap().suggestions, Some(Vec::new()));
        assert!(!store.clear_suggestions("missing"));
    }

    #[test]
    fn hide_form_once() {
        let store = MessageStore::new();
        let mut reply = Message::assistant("fill this in");
        reply.form = Some(form());
        let id = reply.id.clone();
        store.append(reply);

        assert!(store.hide_form(&id));
        assert!(!store.get(&id).unwrap().has_form());
        assert!(!store.hide_form(&id));
    }

    #[test]
    fn preceding_message() {
        let store = MessageStore::new();
        let question = Message::user("q");
        let answer = Message::assistant("a");
        let (qid, aid) = (question.id.clone(), answer.id.clone());
        store.append(question);
        store.append(answer);

        assert_eq!(store.preceding(&aid).unwrap().id, qid);
        let first = store.snapshot()[0].id.clone();
        assert!(store.preceding(&first).is_none());
    }

    #[tokio::test]
    async fn subscribers_see_every_snapshot_in_order() {
        let store = MessageStore::new();
        let mut a = store.subscribe();
        let mut b = store.subscribe();

        store.append(Message::user("one"));
        store.append(Message::user("two"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.next().await.unwrap().len(), 1);
            assert_eq!(sub.next().await.unwrap().len(), 2);
            assert_eq!(sub.next().await.unwrap().len(), 3);
        }
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let store = MessageStore::new();
        let dropped = store.subscribe();
        drop(dropped);
        let kept = store.subscribe();

        store.append(Message::user("x"));

        let mut stream = kept.into_stream();
        assert_eq!(stream.next().await.unwrap().len(), 1);
        assert_eq!(stream.next().await.unwrap().len(), 2);
        assert_eq!(store.lock().subscribers.len(), 1);
    }
}
