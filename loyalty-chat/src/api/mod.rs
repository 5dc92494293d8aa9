//! Chat API gateway and wire types.

mod client;
mod types;

pub use client::{
    apology_message, log_failure, ChatGateway, APOLOGY_MESSAGE, CHAT_PATH, CLEAR_CHAT_PATH,
    RETRY_SUGGESTIONS,
};
pub use types::{
    migrate_table, Agent, ChatRequest, ChatResponse, ClearChatRequest, Model, UserRole,
};
