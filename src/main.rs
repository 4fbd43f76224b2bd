//! warehouse-tui: a terminal dashboard over a star-schema sales warehouse.
//!
//! Loads the latest Parquet snapshot of each warehouse table from object
//! storage (or reads a SQLite warehouse directly), and offers table browsing,
//! null checks, descriptive statistics and fixed sales analyses.

mod analysis;
mod app;
mod cli;
mod commands;
mod data;
mod logging;
mod ui;

use anyhow::Result;
use cli::{AppConfig, Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Show {
            source,
            dashboard_url,
            log_file,
        } => {
            let config = AppConfig::from_show_command(source, dashboard_url, log_file)?;
            logging::init_file(&config.log_file)?;

            // Run the TUI application
            app::run(config)?;
        }
        Commands::Resolve { source, output } => {
            logging::init_stderr();
            commands::resolve(&source, output.as_deref())?;
        }
        Commands::Publish { source, date } => {
            logging::init_stderr();
            commands::publish_snapshots(&source, date)?;
        }
    }

    Ok(())
}
