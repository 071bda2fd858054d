//! Stats command - prints cache statistics and model info

/// Print current stats
pub async fn run() -> anyhow::Result<()> {
    let state = super::bootstrap().await?;

    let stats = state.search_service.stats().await;

    super::print_json(&stats)
}
