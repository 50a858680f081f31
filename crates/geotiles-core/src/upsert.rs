// crates/geotiles-core/src/upsert.rs

//! # Chunked Upsert
//!
//! Rows are written in fixed-size chunks, in order. A failing chunk stops
//! the run and reports how many rows the earlier chunks committed; nothing
//! is rolled back, because re-running the whole upsert is idempotent per
//! key.

use crate::error::{GeoTilesError, Result};
use crate::projection::RenderMeta;
use crate::storage::svg_key;
use crate::sync::{retry, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// One row per published feature, keyed by `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRow {
    pub code: String,
    pub name: String,
    pub alt_name: Option<String>,
    pub svg_key: String,
    pub centroid_lon: f64,
    pub centroid_lat: f64,
}

impl From<&RenderMeta> for TileRow {
    fn from(meta: &RenderMeta) -> Self {
        Self {
            code: meta.code.clone(),
            name: meta.name.clone(),
            alt_name: meta.alt_name.clone(),
            svg_key: svg_key(&meta.code),
            centroid_lon: meta.centroid.lon,
            centroid_lat: meta.centroid.lat,
        }
    }
}

/// Relational store seen by the pipeline.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Inserts or overwrites `rows` in `table`, matching on `code`.
    /// Returns the number of rows written.
    async fn upsert_rows(&self, table: &str, rows: &[TileRow]) -> Result<usize>;

    /// Removes every row of `table`. Only reachable behind the destructive guard.
    async fn delete_all(&self, table: &str) -> Result<u64>;
}

/// Outcome of a fully successful chunked upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub upserted: usize,
    pub chunks: usize,
}

/// Upserts `rows` in chunks of `chunk_size`, stopping at the first chunk
/// that still fails after `policy` is spent.
///
/// On failure the error is [`GeoTilesError::Upsert`] with the zero-based
/// chunk index and `committed = chunk_index × chunk_size`.
pub async fn upsert_chunked(
    sink: &dyn RowSink,
    table: &str,
    rows: &[TileRow],
    chunk_size: usize,
    policy: &RetryPolicy,
) -> Result<UpsertSummary> {
    if chunk_size == 0 {
        return Err(GeoTilesError::Validation(
            "upsert chunk size must be at least 1".into(),
        ));
    }

    let mut committed = 0usize;
    let mut chunks = 0usize;
    for (chunk_index, chunk) in rows.chunks(chunk_size).enumerate() {
        let label = format!("{table}#{chunk_index}");
        let attempted = retry(policy, &label, |_| sink.upsert_rows(table, chunk)).await;
        match attempted.result {
            Ok(_) => {
                committed += chunk.len();
                chunks += 1;
                debug!(%table, chunk_index, rows = chunk.len(), committed, "chunk committed");
            }
            Err(e) => {
                error!(%table, chunk_index, committed, error = %e, "chunk failed");
                return Err(GeoTilesError::Upsert {
                    chunk_index,
                    committed,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(%table, upserted = committed, chunks, "upsert complete");
    Ok(UpsertSummary {
        upserted: committed,
        chunks,
    })
}

// -----------------------------------------------------------------------------
// POSTGRES SINK
// -----------------------------------------------------------------------------

#[cfg(feature = "postgres")]
pub use self::postgres::PgRowSink;

#[cfg(feature = "postgres")]
mod postgres {
    use super::{RowSink, TileRow};
    use crate::error::{GeoTilesError, Result};
    use async_trait::async_trait;
    use sqlx::postgres::{PgPool, PgPoolOptions};
    use std::time::Duration;

    /// Tables this sink will write to. Table names cannot be bound as
    /// parameters, so they are checked against this list instead.
    const KNOWN_TABLES: &[&str] = &["countries", "departments"];

    fn checked_table(table: &str) -> Result<&str> {
        if KNOWN_TABLES.contains(&table) {
            Ok(table)
        } else {
            Err(GeoTilesError::Validation(format!("unknown table `{table}`")))
        }
    }

    #[derive(Debug, Clone)]
    pub struct PgRowSink {
        pool: PgPool,
    }

    impl PgRowSink {
        pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await?;
            Ok(Self { pool })
        }

        pub fn from_pool(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl RowSink for PgRowSink {
        async fn upsert_rows(&self, table: &str, rows: &[TileRow]) -> Result<usize> {
            let table = checked_table(table)?;
            if rows.is_empty() {
                return Ok(0);
            }
            let codes: Vec<String> = rows.iter().map(|r| r.code.clone()).collect();
            let names: Vec<String> = rows.iter().map(|r| r.name.clone()).collect();
            let alt_names: Vec<Option<String>> = rows.iter().map(|r| r.alt_name.clone()).collect();
            let keys: Vec<String> = rows.iter().map(|r| r.svg_key.clone()).collect();
            let lons: Vec<f64> = rows.iter().map(|r| r.centroid_lon).collect();
            let lats: Vec<f64> = rows.iter().map(|r| r.centroid_lat).collect();

            let sql = format!(
                r#"
                WITH input AS (
                    SELECT UNNEST($1::text[])   AS code,
                           UNNEST($2::text[])   AS name,
                           UNNEST($3::text[])   AS alt_name,
                           UNNEST($4::text[])   AS svg_key,
                           UNNEST($5::float8[]) AS centroid_lon,
                           UNNEST($6::float8[]) AS centroid_lat
                )
                INSERT INTO public.{table} (code, name, alt_name, svg_key, centroid_lon, centroid_lat, updated_at)
                SELECT code, name, alt_name, svg_key, centroid_lon, centroid_lat, now() FROM input
                ON CONFLICT (code) DO UPDATE
                SET name = EXCLUDED.name,
                    alt_name = EXCLUDED.alt_name,
                    svg_key = EXCLUDED.svg_key,
                    centroid_lon = EXCLUDED.centroid_lon,
                    centroid_lat = EXCLUDED.centroid_lat,
                    updated_at = EXCLUDED.updated_at
                "#
            );
            let done = sqlx::query(&sql)
                .persistent(false)
                .bind(&codes)
                .bind(&names)
                .bind(&alt_names)
                .bind(&keys)
                .bind(&lons)
                .bind(&lats)
                .execute(&self.pool)
                .await?;
            Ok(done.rows_affected() as usize)
        }

        async fn delete_all(&self, table: &str) -> Result<u64> {
            let table = checked_table(table)?;
            let done = sqlx::query(&format!("DELETE FROM public.{table}"))
                .execute(&self.pool)
                .await?;
            Ok(done.rows_affected())
        }
    }
}
