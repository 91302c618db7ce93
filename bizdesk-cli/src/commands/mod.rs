//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod auth;
mod books;
mod pipeline;
mod session;

pub use auth::AuthCommands;
pub use books::BooksCommands;
pub use pipeline::PipelineCommands;
pub use session::SessionCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// CRM pipeline management (local)
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Accounting records on the API
    Books {
        #[command(subcommand)]
        command: BooksCommands,
    },
    /// Sign in and out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Idle session handling
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config),
        Commands::Books { command } => books::handle_books_command(command, config).await,
        Commands::Auth { command } => auth::handle_auth_command(command, config).await,
        Commands::Session { command } => session::handle_session_command(command, config).await,
    }
}
