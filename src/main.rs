use clap::Parser;
use nearby_search::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Search(args) => cli::search::run(args).await,
        Command::Backfill => cli::backfill::run().await,
        Command::Stats => cli::stats::run().await,
        Command::Invalidate(args) => cli::invalidate::run(args).await,
    }
}
