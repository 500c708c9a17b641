//! Satchel CLI - offline-first bookkeeping records from the terminal
//!
//! Captures creates, edits and deletes locally and replays them once the
//! server is reachable.

mod cli;
mod commands;
mod error;
mod profile;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::ClientEnv;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("satchel=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let client_env = ClientEnv {
        offline: cli.offline,
        data_dir: cli.data_dir,
    };

    match cli.command {
        Commands::List {
            resource,
            page,
            per_page,
            search,
            json,
        } => {
            commands::list::run_list(&resource, page, per_page, &search, json, &client_env).await?;
        }
        Commands::Add { resource, fields } => {
            commands::add::run_add(&resource, &fields, &client_env).await?;
        }
        Commands::Edit {
            resource,
            id,
            fields,
        } => {
            commands::edit::run_edit(&resource, &id, &fields, &client_env).await?;
        }
        Commands::Rm {
            resource,
            id,
            yes,
            label,
        } => {
            commands::rm::run_rm(&resource, &id, yes, label.as_deref(), &client_env).await?;
        }
        Commands::Sync { resource } => {
            commands::sync::run_sync(&resource, &client_env).await?;
        }
        Commands::Status { resource, json } => {
            commands::sync::run_status(&resource, json, &client_env)?;
        }
        Commands::Login { email, api_url } => {
            commands::session::run_login(&email, api_url.as_deref())?;
        }
        Commands::Logout => {
            commands::session::run_logout()?;
        }
    }

    Ok(())
}
