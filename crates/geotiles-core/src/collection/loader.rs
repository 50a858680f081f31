// crates/geotiles-core/src/collection/loader.rs

use super::order::compare_codes;
use super::raw::{RawCollection, RawFeature, RawGeometry, RawMultiPolygon, RawPolygon};
use super::schema::{is_valid_code, normalize_code, Schema};
use super::{Family, LoadedFeature, NormalizedFeature};
use crate::error::{GeoTilesError, Result};
use crate::geometry::{bbox_raw, bbox_unwrapped, centroid, Geometry, LonLat, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use tracing::{debug, info, warn};

/// What happened to every input feature during a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub total: usize,
    pub loaded: usize,
    pub skipped_geometry: usize,
    pub skipped_attributes: usize,
    pub rejected_codes: usize,
    pub duplicates: usize,
}

impl LoadReport {
    pub fn skipped(&self) -> usize {
        self.skipped_geometry + self.skipped_attributes + self.rejected_codes + self.duplicates
    }
}

/// Features dropped by [`normalize_all`], with the reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    pub skipped: Vec<(String, String)>,
}

/// Parses a GeoJSON document from any reader and loads it.
pub fn load_from_reader<R: Read>(
    reader: R,
    family: Family,
) -> Result<(Vec<LoadedFeature>, LoadReport)> {
    let raw: RawCollection = serde_json::from_reader(reader)
        .map_err(|e| GeoTilesError::Validation(format!("not a GeoJSON document: {e}")))?;
    load_collection(raw, family)
}

/// Validates, deduplicates and orders the features of a collection.
///
/// Only the top-level shape is fatal; individual features with unusable
/// geometry, missing attributes or rejected codes are skipped and counted.
pub fn load_collection(
    raw: RawCollection,
    family: Family,
) -> Result<(Vec<LoadedFeature>, LoadReport)> {
    match raw.kind.as_deref() {
        Some("FeatureCollection") => {}
        other => {
            return Err(GeoTilesError::Validation(format!(
                "expected a FeatureCollection, got {}",
                other.unwrap_or("no `type` member")
            )))
        }
    }

    let mut report = LoadReport {
        total: raw.features.len(),
        ..LoadReport::default()
    };
    let geometries: Vec<Option<Geometry>> = raw
        .features
        .iter()
        .map(|f| f.geometry.as_ref().and_then(convert_geometry))
        .collect();

    // Nothing to key: no schema to recognize either.
    if geometries.iter().all(Option::is_none) {
        report.skipped_geometry = report.total;
        info!(%family, total = report.total, "collection has no polygonal features");
        return Ok((Vec::new(), report));
    }

    let schema = Schema::resolve(family, &raw.features)?;
    debug!(%family, ?schema, "resolved attribute schema");

    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<LoadedFeature> = Vec::with_capacity(raw.features.len());

    for (idx, (f, geometry)) in raw.features.iter().zip(geometries).enumerate() {
        let geometry = match geometry {
            Some(g) => g,
            None => {
                report.skipped_geometry += 1;
                debug!(idx, "skipping feature without polygonal geometry");
                continue;
            }
        };

        let (code, name) = match (f.text(&schema.code_key), f.text(&schema.name_key)) {
            (Some(c), Some(n)) => (normalize_code(c), n.to_string()),
            _ => {
                report.skipped_attributes += 1;
                debug!(idx, "skipping feature without code or name");
                continue;
            }
        };

        if !is_valid_code(family, &code) {
            report.rejected_codes += 1;
            debug!(idx, %code, "rejecting code outside the accepted set");
            continue;
        }

        if !seen.insert(code.clone()) {
            report.duplicates += 1;
            warn!(%code, "duplicate code, keeping first occurrence");
            continue;
        }

        out.push(LoadedFeature {
            code,
            name,
            alt_name: alt_name(f, &schema),
            geometry,
        });
    }

    // Stable sort: equal codes are impossible after dedup, so the order
    // depends on the codes alone.
    out.sort_by(|a, b| compare_codes(&a.code, &b.code));
    report.loaded = out.len();

    info!(
        %family,
        total = report.total,
        loaded = report.loaded,
        skipped = report.skipped(),
        "loaded feature collection"
    );
    Ok((out, report))
}

fn alt_name(f: &RawFeature, schema: &Schema) -> Option<String> {
    schema
        .alt_name_key
        .as_deref()
        .and_then(|k| f.text(k))
        .map(str::to_string)
}

fn convert_geometry(g: &RawGeometry) -> Option<Geometry> {
    match g.kind.as_str() {
        "Polygon" => {
            let raw: RawPolygon = serde_json::from_value(g.coordinates.clone()).ok()?;
            Some(Geometry::Polygon(convert_polygon(raw)?))
        }
        "MultiPolygon" => {
            let raw: RawMultiPolygon = serde_json::from_value(g.coordinates.clone()).ok()?;
            let polygons = raw
                .into_iter()
                .map(convert_polygon)
                .collect::<Option<Vec<_>>>()?;
            Some(Geometry::MultiPolygon(polygons))
        }
        _ => None,
    }
}

fn convert_polygon(raw: RawPolygon) -> Option<Polygon> {
    raw.into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|pos| match pos.as_slice() {
                    [lon, lat, ..] => Some(LonLat::new(*lon, *lat)),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
        })
        .collect()
}

// -----------------------------------------------------------------------------
// NORMALIZATION
// -----------------------------------------------------------------------------

/// Centroid, raw bbox and unwrapped bbox of one feature. The unwrap
/// reference is the feature's own centroid longitude.
pub fn normalize_feature(feature: LoadedFeature) -> Result<NormalizedFeature> {
    let c = centroid(&feature.geometry)?;
    let raw = bbox_raw(&feature.geometry)?;
    let unwrapped = bbox_unwrapped(&feature.geometry, c.lon)?;
    if !unwrapped.is_valid() {
        return Err(GeoTilesError::GeometryInvalid(format!(
            "unwrapped bbox of {} is inverted or non-finite",
            feature.code
        )));
    }
    Ok(NormalizedFeature {
        feature,
        centroid: c,
        bbox_raw: raw,
        unwrap_ref: c.lon,
        bbox_unwrapped: unwrapped,
    })
}

/// Normalizes every feature, skipping (and recording) the invalid ones.
pub fn normalize_all(features: Vec<LoadedFeature>) -> (Vec<NormalizedFeature>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let mut out = Vec::with_capacity(features.len());
    for feature in features {
        let code = feature.code.clone();
        match normalize_feature(feature) {
            Ok(n) => out.push(n),
            Err(e) => {
                warn!(%code, error = %e, "skipping feature with invalid geometry");
                report.skipped.push((code, e.to_string()));
            }
        }
    }
    (out, report)
}
