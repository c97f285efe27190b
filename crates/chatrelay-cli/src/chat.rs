use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatrelay_client::{
    CancellationToken, ChatStreamClient, ClientConfig, CredentialProvider, StaticCredentials,
    StreamCallbacks, StreamOutcome,
};
use chatrelay_contracts::ChatMessage;
use tracing::{info, warn};

use crate::cli::ChatArgs;

pub async fn run(args: ChatArgs) -> Result<()> {
    let credentials: Arc<dyn CredentialProvider> = match &args.token {
        Some(token) => Arc::new(StaticCredentials::new(token.clone())),
        None => Arc::new(StaticCredentials::none()),
    };
    let client = ChatStreamClient::with_config(&args.endpoint, credentials, ClientConfig::from_env())
        .context("Failed to create chat client")?;

    let messages = build_messages(&args);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling stream");
            ctrl_c.cancel();
        }
    });

    info!(endpoint = %client.endpoint(), messages = messages.len(), "Starting chat stream");
    let mut stdout = std::io::stdout();
    let outcome = client
        .stream_chat(
            &messages,
            StreamCallbacks::new(|delta| {
                if let Err(err) = stdout.write_all(delta.as_bytes()).and_then(|_| stdout.flush()) {
                    warn!(error = %err, "Failed to write delta");
                }
            }),
            &cancel,
        )
        .await;

    match outcome {
        Ok(StreamOutcome::Completed) => {
            println!();
            Ok(())
        }
        Ok(StreamOutcome::Cancelled) => {
            eprintln!("\n[cancelled]");
            Ok(())
        }
        // Without an on_error callback failures come back as Err.
        Ok(StreamOutcome::Failed) => Ok(()),
        Err(err) => {
            println!();
            Err(err).context("Chat stream failed")
        }
    }
}

fn build_messages(args: &ChatArgs) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &args.system {
        messages.push(ChatMessage::system(system.clone()));
    }
    messages.push(ChatMessage::user(args.prompt_text()));
    messages
}
