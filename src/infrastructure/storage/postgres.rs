//! PostgreSQL listing repository with connection pooling

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::geo::GeoCell;
use crate::domain::listing::{Listing, ListingId, ListingRepository, ListingStatus};
use crate::domain::DomainError;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/nearby_search".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

const LISTING_COLUMNS: &str = "id, provider_id, title, description, category, status, \
     latitude, longitude, cell_id, embedding, created_at";

fn unavailable(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::dependency_unavailable("storage", format!("{}: {}", context, e))
}

/// Listing storage backed by a `listings` table.
///
/// Cell ids are stored in their hex text form and indexed, so the proximity
/// filter is a single `cell_id = ANY($1)` lookup. Embeddings live in a JSONB
/// array column.
pub struct PostgresListingRepository {
    pool: PgPool,
}

impl Debug for PostgresListingRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresListingRepository")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a repository with its own connection pool
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| unavailable("Failed to connect to PostgreSQL", e))?;

        Ok(Self::new(pool))
    }

    /// Ensures the listings table and its cell index exist
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id BIGINT PRIMARY KEY,
                provider_id BIGINT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                category TEXT,
                status VARCHAR(16) NOT NULL DEFAULT 'active',
                latitude DOUBLE PRECISION,
                longitude DOUBLE PRECISION,
                cell_id VARCHAR(20),
                embedding JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create listings table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_listings_cell_id ON listings (cell_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create cell index: {}", e)))?;

        Ok(())
    }

    fn listing_from_row(row: &PgRow) -> Result<Listing, DomainError> {
        let decode = |e: sqlx::Error| DomainError::storage(format!("Failed to decode listing: {}", e));

        let status: String = row.try_get("status").map_err(decode)?;
        let cell: Option<String> = row.try_get("cell_id").map_err(decode)?;
        let embedding: Option<serde_json::Value> = row.try_get("embedding").map_err(decode)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

        Ok(Listing {
            id: row.try_get("id").map_err(decode)?,
            provider_id: row.try_get("provider_id").map_err(decode)?,
            title: row.try_get("title").map_err(decode)?,
            description: row.try_get("description").map_err(decode)?,
            category: row.try_get("category").map_err(decode)?,
            status: status.parse::<ListingStatus>()?,
            latitude: row.try_get("latitude").map_err(decode)?,
            longitude: row.try_get("longitude").map_err(decode)?,
            cell: cell.map(|c| c.parse::<GeoCell>()).transpose()?,
            embedding: embedding.map(decode_embedding).transpose()?,
            created_at,
        })
    }
}

fn decode_embedding(value: serde_json::Value) -> Result<Vec<f32>, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::storage(format!("Failed to decode embedding: {}", e)))
}

fn encode_embedding(embedding: &[f32]) -> serde_json::Value {
    serde_json::Value::Array(
        embedding
            .iter()
            .map(|v| serde_json::json!(v))
            .collect(),
    )
}

#[async_trait]
impl ListingRepository for PostgresListingRepository {
    async fn find_active_in_cells(&self, cells: &[GeoCell]) -> Result<Vec<Listing>, DomainError> {
        if cells.is_empty() {
            return Ok(Vec::new());
        }

        let cell_ids: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        let query = format!(
            "SELECT {} FROM listings WHERE status = 'active' AND cell_id = ANY($1) ORDER BY id",
            LISTING_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(&cell_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| unavailable("Failed to fetch listings by cell", e))?;

        debug!(cells = cell_ids.len(), rows = rows.len(), "Fetched candidate listings");

        rows.iter().map(Self::listing_from_row).collect()
    }

    async fn get(&self, id: ListingId) -> Result<Option<Listing>, DomainError> {
        let query = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("Failed to get listing", e))?;

        row.as_ref().map(Self::listing_from_row).transpose()
    }

    async fn upsert(&self, listing: Listing) -> Result<Listing, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO listings (id, provider_id, title, description, category, status,
                                  latitude, longitude, cell_id, embedding, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                provider_id = EXCLUDED.provider_id,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                status = EXCLUDED.status,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                cell_id = EXCLUDED.cell_id,
                embedding = EXCLUDED.embedding,
                updated_at = NOW()
            "#,
        )
        .bind(listing.id)
        .bind(listing.provider_id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.category)
        .bind(listing.status.as_str())
        .bind(listing.latitude)
        .bind(listing.longitude)
        .bind(listing.cell.map(|c| c.to_string()))
        .bind(listing.embedding.as_deref().map(encode_embedding))
        .bind(listing.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("Failed to upsert listing", e))?;

        Ok(listing)
    }

    async fn list_needing_backfill(&self) -> Result<Vec<Listing>, DomainError> {
        let query = format!(
            r#"
            SELECT {} FROM listings
            WHERE embedding IS NULL
               OR jsonb_array_length(embedding) = 0
               OR (cell_id IS NULL AND latitude IS NOT NULL AND longitude IS NOT NULL)
            ORDER BY id
            "#,
            LISTING_COLUMNS
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| unavailable("Failed to list listings for backfill", e))?;

        rows.iter().map(Self::listing_from_row).collect()
    }

    async fn update_derived(
        &self,
        id: ListingId,
        cell: Option<GeoCell>,
        embedding: Option<Vec<f32>>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET cell_id = COALESCE($2, cell_id),
                embedding = COALESCE($3, embedding),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(cell.map(|c| c.to_string()))
        .bind(embedding.as_deref().map(encode_embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("Failed to update derived listing fields", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_default() {
        let config = PostgresConfig::default();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://db/listings").with_max_connections(4);

        assert_eq!(config.url, "postgres://db/listings");
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_embedding_json_round_trip() {
        let json = encode_embedding(&[0.25, -0.5]);

        assert_eq!(json, serde_json::json!([0.25, -0.5]));
        assert_eq!(decode_embedding(json).unwrap(), vec![0.25, -0.5]);
        assert!(decode_embedding(serde_json::json!({"a": 1})).is_err());
    }

    #[tokio::test]
    async fn test_connect_failure_is_transient() {
        let config = PostgresConfig {
            connect_timeout_secs: 1,
            ..PostgresConfig::new("postgres://nobody@127.0.0.1:1/none")
        };

        let err = PostgresListingRepository::connect(&config).await.unwrap_err();
        assert!(err.is_transient());
    }
}
