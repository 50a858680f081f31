// crates/geotiles-core/src/pipeline.rs

//! # Pipeline
//!
//! `build`: source file → load → normalize → project → `render.json` +
//! sidecar. `publish`: SVGs from the external renderer → blob storage →
//! rows. `reseed`: guarded delete, then publish.
//!
//! Each entry point stops at the first fatal error and returns a
//! [`PipelineError`] naming the stage and how many units it had finished.
//! There is no rollback: uploads and upserts are idempotent, so re-running
//! is the recovery path.

use crate::collection::{normalize_all, Family, LoadReport, LoadedFeature};
use crate::config::Config;
use crate::error::{GeoTilesError, PipelineError, Stage, StageContext};
use crate::guard::DestructiveGuard;
use crate::output::{svg_path, write_outputs};
use crate::projection::{project, ProjectionSettings, RenderMeta};
use crate::source::load_features_cached;
use crate::storage::{svg_key, BlobStore, UploadRequest, DEFAULT_CACHE_CONTROL, SVG_CONTENT_TYPE};
use crate::sync::{retry, JobOutcome, RetryPolicy, SyncJob, SyncOrchestrator, SyncReport};
use crate::upsert::{upsert_chunked, RowSink, TileRow};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

// -----------------------------------------------------------------------------
// BUILD
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub family: Family,
    pub load: LoadReport,
    /// `(code, reason)` for features dropped during normalization/projection.
    pub skipped: Vec<(String, String)>,
    pub metas: Vec<RenderMeta>,
    pub out_dir: Option<PathBuf>,
}

/// Normalizes and projects features in order. Invalid features are
/// skipped and listed; they never abort the batch.
pub fn frame_features(
    features: Vec<LoadedFeature>,
    settings: &ProjectionSettings,
) -> (Vec<RenderMeta>, Vec<(String, String)>) {
    let (normalized, report) = normalize_all(features);
    let mut skipped = report.skipped;
    let mut metas = Vec::with_capacity(normalized.len());
    for feature in &normalized {
        match project(feature, settings) {
            Ok(meta) => metas.push(meta),
            Err(e) => {
                warn!(code = %feature.code(), error = %e, "skipping feature that cannot be framed");
                skipped.push((feature.code().to_string(), e.to_string()));
            }
        }
    }
    (metas, skipped)
}

/// Downloads the family's source unless it is already in the data directory.
pub async fn fetch(config: &Config, family: Family, force: bool) -> PipelineResult<PathBuf> {
    crate::source::fetch_source(config, family, force)
        .await
        .stage(Stage::Fetch, 0)
}

/// Loads `source`, frames every feature and writes the outputs.
pub fn build(config: &Config, family: Family, source: &Path) -> PipelineResult<BuildReport> {
    let (features, load) = load_features_cached(source, family).stage(Stage::Load, 0)?;
    let settings = ProjectionSettings::for_family(family);
    let (metas, skipped) = frame_features(features, &settings);

    let dir = write_outputs(&config.out_dir, family, &metas)
        .stage(Stage::Write, metas.len())?;
    info!(
        %family,
        framed = metas.len(),
        skipped = skipped.len() + load.skipped(),
        dir = %dir.display(),
        "build complete"
    );

    Ok(BuildReport {
        family,
        load,
        skipped,
        metas,
        out_dir: Some(dir),
    })
}

// -----------------------------------------------------------------------------
// PUBLISH
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub family: Family,
    pub sync: SyncReport,
    pub upserted: usize,
    /// Rows removed by `reseed`; `None` for a plain publish.
    pub deleted: Option<u64>,
}

impl PublishReport {
    pub fn uploaded(&self) -> usize {
        self.sync.succeeded
    }

    pub fn failed(&self) -> usize {
        self.sync.failed
    }
}

/// Holds the shared store handles for the publish stages.
pub struct Publisher {
    blob: Arc<dyn BlobStore>,
    rows: Arc<dyn RowSink>,
    orchestrator: SyncOrchestrator,
    retry: RetryPolicy,
    chunk_size: usize,
    guard: DestructiveGuard,
}

impl Publisher {
    pub fn new(config: &Config, blob: Arc<dyn BlobStore>, rows: Arc<dyn RowSink>) -> Self {
        Self {
            blob,
            rows,
            orchestrator: SyncOrchestrator::new(config.concurrency, config.retry),
            retry: config.retry,
            chunk_size: config.chunk_size,
            guard: config.guard,
        }
    }

    /// Uploads every feature's SVG and upserts the rows of those that made it.
    pub async fn publish(
        &self,
        out_dir: &Path,
        family: Family,
        metas: &[RenderMeta],
    ) -> PipelineResult<PublishReport> {
        let jobs = collect_jobs(out_dir, family, metas).stage(Stage::Upload, 0)?;
        self.publish_jobs(family, metas, jobs, None).await
    }

    /// Deletes every row of the family's table, then publishes. Refused
    /// unless the destructive guard is open.
    pub async fn reseed(
        &self,
        out_dir: &Path,
        family: Family,
        metas: &[RenderMeta],
    ) -> PipelineResult<PublishReport> {
        let table = family.table();
        self.guard
            .assert_allowed("reseed", Some(&format!("table {table}")))
            .stage(Stage::Safeguard, 0)?;

        // Every artifact must exist before anything is deleted.
        let jobs = collect_jobs(out_dir, family, metas).stage(Stage::Upload, 0)?;

        let deleted = self.rows.delete_all(table).await.stage(Stage::Delete, 0)?;
        warn!(%table, deleted, "deleted all rows before reseeding");

        self.publish_jobs(family, metas, jobs, Some(deleted)).await
    }

    async fn publish_jobs(
        &self,
        family: Family,
        metas: &[RenderMeta],
        jobs: Vec<SyncJob>,
        deleted: Option<u64>,
    ) -> PipelineResult<PublishReport> {
        let bucket = family.bucket();

        // Once, before any upload starts, so jobs never race to create it.
        let ensured = retry(&self.retry, bucket, |_| self.blob.ensure_bucket(bucket)).await;
        ensured.result.stage(Stage::Bucket, 0)?;

        let blob = Arc::clone(&self.blob);
        let sync = self
            .orchestrator
            .run(jobs, move |target, _attempt| {
                let blob = Arc::clone(&blob);
                async move {
                    let body = tokio::fs::read(&target.source).await.map_err(|e| {
                        GeoTilesError::NotFound(format!("{}: {e}", target.source.display()))
                    })?;
                    blob.upload(UploadRequest {
                        bucket,
                        key: &target.key,
                        body,
                        content_type: SVG_CONTENT_TYPE,
                        cache_control: DEFAULT_CACHE_CONTROL,
                    })
                    .await
                }
            })
            .await;

        let uploaded: HashSet<&str> = sync
            .jobs
            .iter()
            .filter(|j| j.outcome == JobOutcome::Success)
            .map(|j| j.key.as_str())
            .collect();
        let rows: Vec<TileRow> = metas
            .iter()
            .map(TileRow::from)
            .filter(|row| uploaded.contains(row.svg_key.as_str()))
            .collect();

        let summary = match upsert_chunked(
            self.rows.as_ref(),
            family.table(),
            &rows,
            self.chunk_size,
            &self.retry,
        )
        .await
        {
            Ok(summary) => summary,
            Err(e) => {
                let committed = match &e {
                    GeoTilesError::Upsert { committed, .. } => *committed,
                    _ => 0,
                };
                return Err(PipelineError::new(Stage::Upsert, committed, e));
            }
        };

        info!(
            %family,
            uploaded = sync.succeeded,
            failed = sync.failed,
            upserted = summary.upserted,
            "publish complete"
        );
        Ok(PublishReport {
            family,
            sync,
            upserted: summary.upserted,
            deleted,
        })
    }
}

/// One job per feature. Missing SVGs are fatal here, before any mutation.
fn collect_jobs(
    out_dir: &Path,
    family: Family,
    metas: &[RenderMeta],
) -> crate::error::Result<Vec<SyncJob>> {
    let mut jobs = Vec::with_capacity(metas.len());
    let mut missing = Vec::new();
    for meta in metas {
        let path = svg_path(out_dir, family, &meta.code);
        if path.is_file() {
            jobs.push(SyncJob::new(path, svg_key(&meta.code)));
        } else {
            missing.push(meta.code.clone());
        }
    }
    if !missing.is_empty() {
        return Err(GeoTilesError::NotFound(format!(
            "{} SVG file(s) missing under {}: {}",
            missing.len(),
            crate::output::family_dir(out_dir, family).display(),
            missing.join(", ")
        )));
    }
    Ok(jobs)
}

// -----------------------------------------------------------------------------
// REMOTE WIRING
// -----------------------------------------------------------------------------

/// Verifies credentials, then connects the HTTP blob store and the
/// Postgres row sink. Nothing is mutated before the check passes.
#[cfg(feature = "postgres")]
pub async fn connect_remote(config: &Config) -> PipelineResult<Publisher> {
    use crate::credentials::verify_same_project;
    use crate::source::fetch::http_client;
    use crate::storage::HttpBlobStore;
    use crate::upsert::PgRowSink;

    let remote = config.remote().stage(Stage::Credentials, 0)?;
    verify_same_project(
        &remote.storage_url,
        &remote.storage_credentials,
        &remote.db_connection,
    )
    .stage(Stage::Credentials, 0)?;

    let blob = HttpBlobStore::new(http_client(), &remote.storage_url, &remote.storage_credentials);
    let rows = PgRowSink::connect(&remote.db_connection, 2)
        .await
        .stage(Stage::Connect, 0)?;
    Ok(Publisher::new(config, Arc::new(blob), Arc::new(rows)))
}
