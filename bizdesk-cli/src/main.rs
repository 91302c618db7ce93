//! Bizdesk CLI
//!
//! Command-line client for the Bizdesk back office: CRM pipelines kept in a
//! local store, and accounting records on the Bizdesk API.

mod api;
mod commands;
mod config;
mod id_resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bizdesk")]
#[command(about = "Bizdesk back-office CLI", long_about = None)]
struct Cli {
    /// API base URL
    #[arg(long, env = "BIZDESK_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Directory for local data
    #[arg(long, env = "BIZDESK_DATA_DIR", default_value = ".bizdesk")]
    data_dir: PathBuf,

    /// Access token lifetime in seconds
    #[arg(long, env = "BIZDESK_TOKEN_LIFETIME_SECS", default_value_t = 900)]
    token_lifetime_secs: u64,

    /// Seconds before expiry at which an idle user is prompted
    #[arg(long, env = "BIZDESK_PROMPT_BEFORE_EXPIRY_SECS", default_value_t = 60)]
    prompt_before_expiry_secs: u64,

    /// User ID recorded in activity logs
    #[arg(long, env = "BIZDESK_USER_ID")]
    user_id: Option<String>,

    /// User name recorded in activity logs
    #[arg(long, env = "BIZDESK_USER_NAME")]
    user_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bizdesk=info,bizdesk_core=info,bizdesk_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
        data_dir: cli.data_dir,
        token_lifetime: Duration::from_secs(cli.token_lifetime_secs),
        prompt_before_expiry: Duration::from_secs(cli.prompt_before_expiry_secs),
        user_id: cli.user_id,
        user_name: cli.user_name,
    };
    config.validate()?;

    handle_command(cli.command, &config).await
}
