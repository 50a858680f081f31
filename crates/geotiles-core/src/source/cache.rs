// crates/geotiles-core/src/source/cache.rs

use crate::collection::{load_from_reader, Family, LoadReport, LoadedFeature};
use crate::error::{GeoTilesError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CACHE_SUFFIX: &str = "features.bin";

/// Opens a source file, transparently gunzipping `.gz` files.
/// Returns a generic reader so the caller doesn't care about compression.
pub fn open_stream(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| {
        GeoTilesError::NotFound(format!("source not found at {}: {}", path.display(), e))
    })?;
    let reader = BufReader::new(file);

    let gzipped = path.extension().is_some_and(|ext| ext == "gz");
    if !gzipped {
        return Ok(Box::new(reader));
    }

    #[cfg(feature = "compact")]
    {
        use flate2::read::GzDecoder;
        Ok(Box::new(GzDecoder::new(reader)))
    }

    #[cfg(not(feature = "compact"))]
    {
        Err(GeoTilesError::Validation(format!(
            "{} is gzipped but the 'compact' feature is disabled",
            path.display()
        )))
    }
}

pub fn cache_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{name}.{CACHE_SUFFIX}"))
}

#[derive(Serialize, Deserialize)]
struct CachedSet {
    family: Family,
    features: Vec<LoadedFeature>,
    report: LoadReport,
}

fn is_cache_fresh(source: &Path, cache: &Path) -> bool {
    let cache_time = match fs::metadata(cache).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(source_time) => source_time <= cache_time,
        Err(_) => false,
    }
}

/// **Smart Load:** reuses the bincode cache next to the source when it is
/// newer than the source, otherwise parses the source and rewrites the cache.
pub fn load_features_cached(source: &Path, family: Family) -> Result<(Vec<LoadedFeature>, LoadReport)> {
    let cache = cache_path(source);

    if is_cache_fresh(source, &cache) {
        match read_cache(&cache) {
            Ok(set) if set.family == family => {
                debug!(path = %cache.display(), "using feature cache");
                return Ok((set.features, set.report));
            }
            Ok(_) => debug!(path = %cache.display(), "cache belongs to another family"),
            Err(e) => debug!(path = %cache.display(), error = %e, "unreadable feature cache"),
        }
    }

    let (features, report) = load_from_reader(open_stream(source)?, family)?;

    // Best-effort: a failed cache write only costs the next run a re-parse.
    let set = CachedSet {
        family,
        features,
        report,
    };
    match write_cache(&cache, &set) {
        Ok(()) => info!(path = %cache.display(), "wrote feature cache"),
        Err(e) => debug!(path = %cache.display(), error = %e, "could not write feature cache"),
    }
    Ok((set.features, set.report))
}

fn read_cache(path: &Path) -> Result<CachedSet> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

fn write_cache(path: &Path, set: &CachedSet) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, set)?;
    Ok(())
}
