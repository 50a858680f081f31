// crates/geotiles-core/src/error.rs

use std::fmt;
use thiserror::Error;

/// Every failure the core can report.
///
/// The variants follow the propagation policy of the pipeline:
/// structural errors ([`Validation`](GeoTilesError::Validation),
/// [`CredentialMismatch`](GeoTilesError::CredentialMismatch),
/// [`Safeguard`](GeoTilesError::Safeguard)) are never retried, transport
/// errors are retried by the sync layer, and
/// [`GeometryInvalid`](GeoTilesError::GeometryInvalid) only ever skips one
/// feature.
#[derive(Debug, Error)]
pub enum GeoTilesError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid geometry: {0}")]
    GeometryInvalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("storage responded {status}: {message}")]
    Storage { status: u16, message: String },

    #[error("credential mismatch: {0}")]
    CredentialMismatch(String),

    #[error("refusing destructive operation `{operation}`{}: set DESTRUCTIVE_FLAG=1 to allow it", scope_suffix(.scope))]
    Safeguard {
        operation: String,
        scope: Option<String>,
    },

    #[error("upsert failed at chunk {chunk_index} after {committed} committed rows: {message}")]
    Upsert {
        chunk_index: usize,
        committed: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn scope_suffix(scope: &Option<String>) -> String {
    match scope {
        Some(s) => format!(" ({s})"),
        None => String::new(),
    }
}

impl GeoTilesError {
    /// Whether the sync layer may re-issue the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeoTilesError::Network(_) => true,
            GeoTilesError::Storage { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            #[cfg(feature = "postgres")]
            GeoTilesError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GeoTilesError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GeoTilesError::Storage {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => GeoTilesError::Network(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoTilesError>;

// -----------------------------------------------------------------------------
// PIPELINE ERRORS
// -----------------------------------------------------------------------------

/// Stages of the top-level pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Load,
    Write,
    Credentials,
    Connect,
    Safeguard,
    Bucket,
    Upload,
    Delete,
    Upsert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Load => "load",
            Stage::Write => "write",
            Stage::Credentials => "credentials",
            Stage::Connect => "connect",
            Stage::Safeguard => "safeguard",
            Stage::Bucket => "bucket",
            Stage::Upload => "upload",
            Stage::Delete => "delete",
            Stage::Upsert => "upsert",
        };
        f.write_str(name)
    }
}

/// The first fatal error of a pipeline run, with the stage it came from and
/// how many units that stage completed before failing.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed after {succeeded} succeeded: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub succeeded: usize,
    #[source]
    pub source: GeoTilesError,
}

impl PipelineError {
    pub fn new(stage: Stage, succeeded: usize, source: GeoTilesError) -> Self {
        Self {
            stage,
            succeeded,
            source,
        }
    }
}

/// Helper for tagging a stage onto a plain core error.
pub trait StageContext<T> {
    fn stage(self, stage: Stage, succeeded: usize) -> std::result::Result<T, PipelineError>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: Stage, succeeded: usize) -> std::result::Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, succeeded, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safeguard_message_names_operation_and_scope() {
        let e = GeoTilesError::Safeguard {
            operation: "delete_all".into(),
            scope: Some("table departments".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("delete_all"));
        assert!(msg.contains("table departments"));
    }

    #[test]
    fn only_transient_errors_retry() {
        assert!(GeoTilesError::Network("reset".into()).is_retryable());
        assert!(GeoTilesError::Storage { status: 503, message: String::new() }.is_retryable());
        assert!(!GeoTilesError::Storage { status: 403, message: String::new() }.is_retryable());
        assert!(!GeoTilesError::Validation("bad".into()).is_retryable());
        assert!(!GeoTilesError::CredentialMismatch("x".into()).is_retryable());
    }
}
