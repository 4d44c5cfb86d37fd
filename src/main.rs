mod auth;
mod cli;
mod config;
mod error;
mod events;
mod notifier;
mod output;
mod providers;
mod reconciler;
mod registry;
mod relay;
mod render;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting cinotify - GitLab pipeline notifier");
    cli.execute().await?;

    Ok(())
}
