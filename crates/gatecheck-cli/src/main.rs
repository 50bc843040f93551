//! Gatecheck CLI - offline-capable event check-in from the terminal.
//!
//! Staff cache an event once (`gatecheck cache`), then check in attendees
//! and hand out swag whether or not the venue network holds up; queued
//! records sync on `gatecheck sync` or the next reachable operation.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::resolve(&cli).await?;

    match &cli.command {
        Commands::Cache => commands::cache::run(&ctx).await,
        Commands::Checkin { code, json } => commands::checkin::run(&ctx, code, *json).await,
        Commands::Search { query, json } => commands::search::run(&ctx, query, *json).await,
        Commands::Swag {
            checkin,
            item,
            code,
        } => commands::swag::run(&ctx, checkin, *item, code).await,
        Commands::Sync => commands::sync::run(&ctx).await,
        Commands::Status { json } => commands::status::run(&ctx, *json).await,
        Commands::Pending { json } => commands::pending::run(&ctx, *json).await,
        Commands::OfflineMode { state } => commands::status::set_offline_mode(&ctx, *state).await,
    }
}
