mod chat;
mod cli;
mod completions;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("chatrelay")
        .join("logs")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    // Logs go to a file so stdout carries only the reply
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "chatrelay.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    match cli.command {
        Commands::Chat(args) => chat::run(args).await,
        Commands::Completions { .. } => Ok(()),
    }
}
