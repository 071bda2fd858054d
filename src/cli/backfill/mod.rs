//! Backfill command - derives missing cells and embeddings

/// Run a backfill pass
pub async fn run() -> anyhow::Result<()> {
    let state = super::bootstrap().await?;

    let report = state.listing_service.backfill().await?;

    super::print_json(&report)
}
