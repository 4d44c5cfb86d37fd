use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::Token;
use crate::config::Config;
use crate::providers::telegram::TelegramClient;
use crate::registry::PipelineRegistry;
use crate::relay::Relay;
use crate::server;

#[derive(Parser)]
#[command(name = "cinotify")]
#[command(author, version, about = "GitLab pipelines to Telegram", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML, JSON or YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for GitLab pipeline and job webhooks
    Serve {
        #[arg(short, long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Group and channel ids are negative, e.g. -100123
        #[arg(short = 'C', long, env = "TELEGRAM_CHAT_ID", allow_hyphen_values = true)]
        chat_id: Option<String>,

        #[arg(short, long)]
        addr: Option<String>,

        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Forget pipelines not updated for this many seconds
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// Write a default config file
    Init {
        #[arg(default_value = "cinotify.toml")]
        path: PathBuf,
    },
}

impl Cli {
    async fn execute_serve(&self, config: Config) -> Result<()> {
        let telegram = &config.telegram;

        let Some(token) = telegram.token.as_deref().map(Token::from) else {
            bail!("Missing Telegram bot token (use --token or TELEGRAM_TOKEN)");
        };
        let Some(chat_id) = telegram.chat_id.clone() else {
            bail!("Missing Telegram chat id (use --chat-id or TELEGRAM_CHAT_ID)");
        };

        let addr: SocketAddr = config
            .server
            .addr
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.server.addr))?;

        let client = TelegramClient::new(&telegram.api_url, &token, chat_id, telegram.timeout())?;

        let registry = Arc::new(PipelineRegistry::new(config.registry.ttl()));
        if let Some(ttl) = config.registry.ttl() {
            info!("Pipelines expire after {}s of inactivity", ttl.as_secs());
        }
        let _reaper = registry.spawn_reaper(config.registry.sweep_interval());

        let relay = Arc::new(Relay::new(registry, Arc::new(client)));
        server::serve(addr, relay).await
    }

    fn execute_init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Refusing to overwrite existing file: {}", path.display());
        }

        Config::default().save(path)?;
        info!("Default config written to: {}", path.display());
        eprintln!("Wrote {}", path.display());

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve {
                token,
                chat_id,
                addr,
                api_url,
                timeout_secs,
                ttl_secs,
            } => {
                let mut config = Config::load(self.config.as_deref())?;

                if let Some(token) = token {
                    config.telegram.token = Some(token.clone());
                }
                if let Some(chat_id) = chat_id {
                    config.telegram.chat_id = Some(chat_id.clone());
                }
                if let Some(addr) = addr {
                    config.server.addr = addr.clone();
                }
                if let Some(api_url) = api_url {
                    config.telegram.api_url = api_url.clone();
                }
                if let Some(timeout_secs) = timeout_secs {
                    config.telegram.timeout_secs = *timeout_secs;
                }
                if ttl_secs.is_some() {
                    config.registry.ttl_secs = *ttl_secs;
                }

                self.execute_serve(config).await
            }
            Commands::Init { path } => Self::execute_init(path),
        }
    }
}
