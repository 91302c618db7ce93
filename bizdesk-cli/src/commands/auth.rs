//! Authentication command handlers

use anyhow::{Context, Result};
use bizdesk_core::domain::log::Actor;
use bizdesk_core::store::{clear_session, keys, write_json};
use clap::Subcommand;
use colored::*;

use crate::api;
use crate::config::Config;

/// Auth subcommands
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session locally
    Login {
        username: String,
        #[arg(long, env = "BIZDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Refresh the stored access token
    Refresh,
    /// Sign out and remove the local session
    Logout,
}

/// Handle auth commands
pub async fn handle_auth_command(command: AuthCommands, config: &Config) -> Result<()> {
    let store = config.open_store()?;

    match command {
        AuthCommands::Login { username, password } => {
            let client = api::connect(config, &store);
            let tokens = client
                .login(&username, &password)
                .await
                .context("Login failed")?;

            write_json(&store, keys::AUTH_TOKENS, &tokens)?;
            write_json(&store, keys::CURRENT_USER, &Actor::new(&username, &username))?;

            println!("{}", format!("✓ Signed in as {}", username).green().bold());
        }
        AuthCommands::Refresh => {
            let client = api::connect_signed_in(config, &store)?;
            let result = client.refresh().await;
            api::save_session(&client, &store).await?;
            result.context("Token refresh failed")?;

            println!("{}", "✓ Session extended".green().bold());
        }
        AuthCommands::Logout => {
            clear_session(&store)?;
            println!("{}", "✓ Signed out".green().bold());
        }
    }

    Ok(())
}
