mod app;
mod cli;
mod config;
mod db;
mod models;
mod notify;
mod prayer_times;
mod schedule;
mod tracker;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;

use app::AppContext;
use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;
    let ctx = AppContext::open(config)?;

    match cli.command {
        Some(Commands::Times { refresh }) => handlers::handle_times(&ctx, refresh)?,
        Some(Commands::Watch) => handlers::handle_watch(&ctx)?,
        Some(Commands::Toggle { prayer }) => handlers::handle_toggle(&ctx, &prayer)?,
        Some(Commands::Status) => handlers::handle_status(&ctx)?,
        Some(Commands::Assign { date, prayers }) => {
            handlers::handle_assign(&ctx, &date, &prayers)?;
        }
        Some(Commands::Stats { week, grid }) => handlers::handle_stats(&ctx, week, grid)?,
        Some(Commands::Theme { value }) => handlers::handle_theme(&ctx, value.as_deref())?,

        // No subcommand → today's overview
        None => handlers::handle_times(&ctx, false)?,
    }

    Ok(())
}
