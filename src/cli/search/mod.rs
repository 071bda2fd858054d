//! Search command - runs one search and prints the ranked hits

use clap::Args;
use tracing::info;

use crate::domain::search::{DEFAULT_LIMIT, DEFAULT_RADIUS_KM};
use crate::domain::SearchRequest;

/// Arguments for the search command
#[derive(Args, Clone)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(long, short)]
    pub query: String,

    /// Latitude of the search centre
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the search centre
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Search radius in kilometres
    #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
    pub km: u32,

    /// Maximum number of hits
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,
}

impl From<SearchArgs> for SearchRequest {
    fn from(args: SearchArgs) -> Self {
        SearchRequest::new(args.query, args.lat, args.lng)
            .with_radius_km(args.km)
            .with_limit(args.limit)
    }
}

/// Run a search
pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let state = super::bootstrap().await?;

    let results = state.search_service.search(args.into()).await?;

    info!(
        hits = results.hits.len(),
        from_cache = results.from_cache,
        degraded = results.degraded,
        "Search finished"
    );

    super::print_json(&results)
}
