//! CLI module for Nearby Search
//!
//! Provides subcommands that run one operation against the configured
//! storage, cache and embedding provider, printing JSON to stdout:
//! - `search`: ranked listings near a point
//! - `backfill`: derive missing cells and embeddings
//! - `stats`: cache and model status
//! - `invalidate`: drop cached search results

pub mod backfill;
pub mod invalidate;
pub mod search;
pub mod stats;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::AppState;

/// Nearby Search - location-bounded semantic listing search
#[derive(Parser)]
#[command(name = "nearby-search")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search listings near a point
    Search(search::SearchArgs),

    /// Fill in missing cells and embeddings
    Backfill,

    /// Print cache statistics and model info
    Stats,

    /// Remove cached search results matching a pattern
    Invalidate(invalidate::InvalidateArgs),
}

/// Loads `.env` and configuration, initializes logging and builds services
pub(crate) async fn bootstrap() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    crate::create_app_state_with_config(&config).await
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
