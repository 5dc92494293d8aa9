//! Loyalty Chat - terminal host for the Bonnie loyalty-marketing assistant.
//!
//! The binary is a thin shell over the `loyalty_chat` library: it reads
//! configuration from flags and environment, then drives a `ChatService`.

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    execute(cli).await
}

/// Logs go to stderr so they never mix with chat output.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("loyalty_chat={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
