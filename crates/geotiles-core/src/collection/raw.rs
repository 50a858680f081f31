// crates/geotiles-core/src/collection/raw.rs

//! Raw GeoJSON shapes, exactly as they come off disk.
//!
//! NOTE: only the members the loader reads are modelled; everything else in
//! the source document is ignored by serde.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct RawCollection {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

/// Nesting of a Polygon's `coordinates` member.
pub type RawPolygon = Vec<Vec<Vec<f64>>>;

/// Nesting of a MultiPolygon's `coordinates` member.
pub type RawMultiPolygon = Vec<RawPolygon>;

impl RawFeature {
    /// Returns the property as a trimmed string, if present and non-empty.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties
            .as_ref()?
            .get(key)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|p| p.contains_key(key))
    }
}
