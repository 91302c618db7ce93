//! Session watch command
//!
//! Keeps the terminal signed in while it is in use. Every line typed counts
//! as activity; when the stay-signed-in prompt is up, answering `y` extends
//! the session and `logout` ends it.

use anyhow::Result;
use bizdesk_client::{SessionCommand, SessionWatcher};
use bizdesk_core::session::SessionEvent;
use clap::Subcommand;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api;
use crate::config::Config;

/// Session subcommands
#[derive(Subcommand)]
pub enum SessionCommands {
    /// Watch for idleness and prompt before the session expires
    Watch,
}

pub async fn handle_session_command(command: SessionCommands, config: &Config) -> Result<()> {
    match command {
        SessionCommands::Watch => watch(config).await,
    }
}

async fn watch(config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let client = api::connect_signed_in(config, &store)?;
    let mut handle = SessionWatcher::new(config.idle_timer(), client.clone(), store.clone()).spawn();

    println!(
        "{}",
        "Watching session. Type anything to stay active, `logout` to sign out.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut prompt_open = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("stdin closed, leaving session as is");
                    break;
                };
                let command = read_command(&line, prompt_open);
                if !handle.send(command).await {
                    break;
                }
            }
            event = handle.next_event() => match event {
                Some(SessionEvent::PromptShown) => {
                    prompt_open = true;
                    println!(
                        "{}",
                        format!(
                            "Your session expires in {} seconds. Stay signed in? [y/N]",
                            config.prompt_before_expiry.as_secs()
                        )
                        .yellow()
                        .bold()
                    );
                }
                Some(SessionEvent::Extended) => {
                    prompt_open = false;
                    api::save_session(&client, &store).await?;
                    println!("{}", "✓ Session extended".green());
                }
                Some(SessionEvent::LoggedOut(reason)) => {
                    println!("{}", format!("Signed out: {}", reason).red().bold());
                    break;
                }
                None => break,
            },
        }
    }

    Ok(())
}

fn read_command(line: &str, prompt_open: bool) -> SessionCommand {
    let answer = line.trim().to_ascii_lowercase();
    match answer.as_str() {
        "logout" => SessionCommand::Logout,
        "y" | "yes" if prompt_open => SessionCommand::StayLoggedIn,
        _ => SessionCommand::Activity,
    }
}
