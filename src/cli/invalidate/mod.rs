//! Invalidate command - removes cached search results

use clap::Args;
use serde_json::json;

use crate::domain::SearchCacheKey;

/// Arguments for the invalidate command
#[derive(Args, Clone)]
pub struct InvalidateArgs {
    /// Glob pattern (`*`, `?`) of cache keys to remove
    #[arg(default_value_t = SearchCacheKey::all_searches())]
    pub pattern: String,
}

/// Run an invalidation
pub async fn run(args: InvalidateArgs) -> anyhow::Result<()> {
    let state = super::bootstrap().await?;

    let removed = state.search_service.invalidate(&args.pattern).await;

    super::print_json(&json!({ "pattern": args.pattern, "removed": removed }))
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_pattern_defaults_to_all_searches() {
        let cli = Cli::parse_from(["nearby-search", "invalidate"]);

        let Command::Invalidate(args) = cli.command else {
            panic!("expected invalidate command");
        };
        assert_eq!(args.pattern, "search:*");
    }
}
