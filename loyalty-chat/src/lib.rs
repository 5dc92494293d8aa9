//! Loyalty Chat - session controller for the Bonnie loyalty-marketing assistant.
//!
//! The library keeps an ordered chat log, issues and persists the session id
//! sent with every API call, talks to the chat API, validates dynamic forms
//! and exports conversations as reports, JSON transcripts and CSV.
//!
//! Architecture:
//! - [`ChatService`] is the host-facing controller; hosts own it and share it via `Arc`
//! - [`store::MessageStore`] publishes a snapshot to every subscriber on each change
//! - [`api::ChatGateway`] turns remote failures into an apology message

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod form;
pub mod models;
pub mod service;
pub mod session;
pub mod share;
pub mod store;

pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use service::{ChatService, TurnOptions};
