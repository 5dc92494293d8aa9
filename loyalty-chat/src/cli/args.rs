//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use loyalty_chat::api::{Agent, Model, UserRole};
use loyalty_chat::config::DEFAULT_API_URL;
use loyalty_chat::export::ExportKind;

/// Loyalty Chat - talk to the Bonnie loyalty-marketing assistant
#[derive(Parser, Debug)]
#[command(name = "loyalty-chat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the chat API
    #[arg(long, env = "LOYALTY_CHAT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Bearer token for the chat API
    #[arg(long, env = "LOYALTY_CHAT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Your name, used in exports
    #[arg(short, long, env = "LOYALTY_CHAT_USER")]
    pub user: Option<String>,

    /// Model to answer with
    #[arg(short, long, value_enum, default_value_t = ModelArg::Openai)]
    pub model: ModelArg,

    /// Agent to route questions to
    #[arg(short, long, value_enum, default_value_t = AgentArg::Audience)]
    pub agent: AgentArg,

    /// Send requests with the admin role
    #[arg(long)]
    pub admin: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    pub timeout: u64,

    /// Session file (defaults to the user data directory)
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Subcommand to execute (defaults to an interactive chat)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// Attach a CSV or spreadsheet
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Export the answer or conversation afterwards (repeatable)
        #[arg(short, long, value_enum)]
        export: Vec<ExportArg>,

        /// Question to ask
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Clear the conversation and issue a new session id
    New,

    /// Show the current session id
    Session {
        /// Issue a new session id without contacting the server
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelArg {
    Openai,
    Gemini,
}

impl From<ModelArg> for Model {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Openai => Self::OpenAI,
            ModelArg::Gemini => Self::Gemini,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AgentArg {
    Audience,
    Loyalty,
    Rewards,
}

impl From<AgentArg> for Agent {
    fn from(arg: AgentArg) -> Self {
        match arg {
            AgentArg::Audience => Self::AudienceBuilder,
            AgentArg::Loyalty => Self::LoyaltyBuilder,
            AgentArg::Rewards => Self::RewardsBuilder,
        }
    }
}

/// Export formats
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportArg {
    /// Paginated text report of the conversation
    Report,
    /// JSON transcript of the conversation
    Transcript,
    /// Metrics of the answer as CSV
    Metrics,
    /// Table of the answer as CSV
    Table,
    /// Account ids of the answer as CSV
    Accounts,
}

impl From<ExportArg> for ExportKind {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Report => Self::Report,
            ExportArg::Transcript => Self::Transcript,
            ExportArg::Metrics => Self::Metrics,
            ExportArg::Table => Self::Table,
            ExportArg::Accounts => Self::AccountIds,
        }
    }
}

impl Cli {
    pub const fn role(&self) -> UserRole {
        if self.admin {
            UserRole::Admin
        } else {
            UserRole::Regular
        }
    }
}
