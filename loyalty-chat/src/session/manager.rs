//! Session identity management.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::id::{generate_session_id, is_valid_session_id};
use super::storage::{SessionStorage, RELOAD_FLAG_KEY, SESSION_KEY};
use crate::models::Session;

/// Issues and persists the session id used as `userId` on every API call.
///
/// Storage failures never block the chat: they are logged and the manager
/// keeps working from its in-memory copy.
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            current: Mutex::new(None),
        }
    }

    /// Current session id, creating and persisting one if none exists.
    pub fn get_id(&self) -> String {
        self.session().id
    }

    /// Current session, creating one if none exists.
    pub fn session(&self) -> Session {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());

        match self.storage.get(SESSION_KEY) {
            Ok(Some(id)) if is_valid_session_id(&id) => {
                if let Some(session) = current.as_ref().filter(|s| s.id == id) {
                    return session.clone();
                }
                let session = Session::new(id);
                *current = Some(session.clone());
                return session;
            }
            Ok(Some(id)) => warn!(%id, "ignoring malformed stored session id"),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to read session id");
                if let Some(session) = current.as_ref() {
                    return session.clone();
                }
            }
        }

        let session = Session::new(generate_session_id());
        self.persist(&session.id);
        *current = Some(session.clone());
        session
    }

    /// Always issue a fresh id, overwriting persisted state.
    pub fn reset_id(&self) -> String {
        let session = Session::new(generate_session_id());
        self.persist(&session.id);
        debug!(session_id = %session.id, "session id reset");

        let id = session.id.clone();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);
        id
    }

    /// Record that the page is about to unload so the next load starts fresh.
    pub fn mark_unloading(&self) {
        if let Err(e) = self.storage.set(RELOAD_FLAG_KEY, "true") {
            warn!(error = %e, "failed to store reload flag");
        }
    }

    /// Consume the reload flag. Returns true at most once per [`Self::mark_unloading`].
    pub fn take_reload_flag(&self) -> bool {
        let flagged = match self.storage.get(RELOAD_FLAG_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "failed to read reload flag");
                false
            }
        };

        if flagged {
            if let Err(e) = self.storage.remove(RELOAD_FLAG_KEY) {
                warn!(error = %e, "failed to clear reload flag");
            }
        }
        flagged
    }

    fn persist(&self, id: &str) {
        if let Err(e) = self.storage.set(SESSION_KEY, id) {
            warn!(error = %e, "failed to persist session id");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
