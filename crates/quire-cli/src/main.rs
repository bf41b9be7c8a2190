//! Quire CLI - edit documents offline and sync them
//!
//! Two libSQL files stand in for the device cache and the server, so every
//! sync path (including conflicting edits from "another device") can be
//! exercised from the terminal.

mod cli;
mod commands;
mod error;
mod prompt;

use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_paths;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::new::run_new;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
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
    init_tracing();

    let cli = Cli::parse();
    let paths = resolve_db_paths(cli.local_db, cli.remote_db)?;

    match cli.command {
        Commands::New { title, content } => run_new(&title, content.as_deref(), &paths).await,
        Commands::List { limit, json } => run_list(limit, json, &paths).await,
        Commands::Show { id, remote, json } => run_show(&id, remote, json, &paths).await,
        Commands::Edit {
            id,
            field,
            value,
            remote,
        } => run_edit(&id, &field, &value, remote, &paths).await,
        Commands::Sync { id, prefer, json } => run_sync(&id, prefer, json, &paths).await,
    }
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "quire=info".parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
