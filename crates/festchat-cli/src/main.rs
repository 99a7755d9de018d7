//! festchat - terminal client for the FestFlex portal chatbot.

use std::time::Duration;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use festchat_renderer::{ChatSession, RendererConfig};
use festchat_transport::{ChatClient, ClientConfig};

mod repl;
mod tui;

/// Greeting typed out when a conversation opens.
pub(crate) const GREETING: &str =
    "Hello! I'm your FestFlex assistant. How can I help you today?";

/// Terminal client for the FestFlex portal chatbot
#[derive(Parser)]
#[command(name = "festchat")]
#[command(about = "Chat with the FestFlex portal assistant", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Hard per-reply stream timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Full-screen TUI mode
    #[arg(long)]
    tui: bool,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; in TUI mode keep them quiet so they do not
    // corrupt the alternate screen.
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.tui {
        Level::ERROR
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = ChatClient::new(ClientConfig {
        base_url: cli.url,
        stream_timeout: Duration::from_secs(cli.timeout_secs),
    });
    let session = ChatSession::new(RendererConfig::default());

    if cli.tui {
        tui::run(client, session).await
    } else {
        repl::run(client, session).await
    }
}
