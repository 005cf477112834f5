//! Interactive console for driving a remote command session.
//!
//! Run with: remote-console --server ws://host:22233/ws

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use remote_console_session::{Console, InputSource, ReconnectLoop, TerminalPrompter};
use remote_console_transport::WebSocketConnector;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level)?;

    let config = cli.client_config();
    tracing::info!(server = %config.server_url, "Starting remote console");

    let input = InputSource::stdin().context("failed to start the input reader")?;
    let console = Console::stdout();
    let connector = WebSocketConnector::new(config.server_url.clone());

    let summary = ReconnectLoop::new(connector, TerminalPrompter::new(console.clone()), config)
        .with_console(console)
        .run(input)
        .await;
    tracing::info!(?summary, "Remote console stopped");

    Ok(())
}
