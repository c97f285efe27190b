use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(version, about = "ChatRelay - stream chat replies from a relay endpoint")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one prompt and stream the reply to stdout
    Chat(ChatArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ChatArgs {
    /// Prompt text; multiple words are joined with spaces
    #[arg(required = true)]
    pub prompt: Vec<String>,

    /// Optional system message sent before the prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Relay endpoint
    #[arg(
        long,
        env = "CHATRELAY_ENDPOINT",
        default_value = "http://localhost:8080/chat"
    )]
    pub endpoint: String,

    /// Bearer token for the relay
    #[arg(long, env = "CHATRELAY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl ChatArgs {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }
}
