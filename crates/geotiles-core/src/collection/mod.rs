// crates/geotiles-core/src/collection/mod.rs

//! # Feature Collections
//!
//! Turns a raw GeoJSON `FeatureCollection` into a deduplicated,
//! deterministically ordered list of boundary features, then normalizes
//! each one (centroid + bounding boxes).

pub mod loader;
pub mod order;
pub mod raw;
pub mod schema;

use crate::geometry::{BBox, Geometry, LonLat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use loader::{
    load_collection, load_from_reader, normalize_all, normalize_feature, LoadReport, NormalizeReport,
};
pub use order::compare_codes;
pub use schema::{is_valid_code, normalize_code, Schema};

/// The artifact families the pipeline knows how to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Countries,
    Departments,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Countries => "countries",
            Family::Departments => "departments",
        }
    }

    /// Storage bucket holding this family's SVGs.
    pub fn bucket(&self) -> &'static str {
        self.as_str()
    }

    /// Relational table holding this family's rows.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "countries" | "country" => Ok(Family::Countries),
            "departments" | "department" | "departements" => Ok(Family::Departments),
            other => Err(format!(
                "unknown family `{other}` (expected countries or departments)"
            )),
        }
    }
}

/// One feature as accepted by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedFeature {
    /// Normalized (trimmed, uppercase) and domain-validated.
    pub code: String,
    pub name: String,
    pub alt_name: Option<String>,
    pub geometry: Geometry,
}

/// A feature with its framing inputs computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeature {
    pub feature: LoadedFeature,
    pub centroid: LonLat,
    pub bbox_raw: BBox,
    /// Always the feature's own centroid longitude.
    pub unwrap_ref: f64,
    pub bbox_unwrapped: BBox,
}

impl NormalizedFeature {
    pub fn code(&self) -> &str {
        &self.feature.code
    }
}
