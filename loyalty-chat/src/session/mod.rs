//! Session identity: id generation, persistence and reload detection.

mod id;
mod manager;
mod storage;

pub use id::{generate_session_id, is_valid_session_id, session_id_from_bytes, SESSION_ID_LEN};
pub use manager::SessionManager;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, RELOAD_FLAG_KEY, SESSION_KEY};
