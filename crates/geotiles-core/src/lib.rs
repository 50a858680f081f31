// crates/geotiles-core/src/lib.rs

pub mod collection; // Loading, schema, code collation
pub mod config;
pub mod credentials;
pub mod error;
pub mod geometry; // Centroid + bbox math
pub mod guard;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod source; // Download, gzip, feature cache
pub mod storage;
pub mod sync;
pub mod upsert;

// Re-exports
pub use crate::collection::{Family, LoadedFeature, NormalizedFeature};
pub use crate::config::Config;
pub use crate::error::{GeoTilesError, PipelineError, Result, Stage};
pub use crate::geometry::{BBox, Geometry, LonLat};
pub use crate::guard::DestructiveGuard;
pub use crate::pipeline::{BuildReport, PublishReport, Publisher};
pub use crate::projection::{ProjectionSettings, RenderMeta};
pub use crate::sync::{RetryPolicy, SyncOrchestrator, SyncReport};

/// Convenience imports for binaries and demos.
pub mod prelude {
    pub use crate::collection::{Family, LoadedFeature, NormalizedFeature};
    pub use crate::config::Config;
    pub use crate::error::{GeoTilesError, PipelineError, Result};
    pub use crate::pipeline::{build, fetch, frame_features, Publisher};
    pub use crate::projection::{project, ProjectionSettings, RenderMeta};
}
