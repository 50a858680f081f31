// crates/geotiles-core/src/source/mod.rs

//! # Data Sources
//!
//! Handles the physical layer: which URLs a family is fetched from, the
//! download itself ([`fetch`]), and reading the file back, optionally
//! gzip-decoded, with a bincode cache of the loaded features
//! ([`cache`]).

pub mod cache;
pub mod fetch;

use crate::collection::Family;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use cache::{load_features_cached, open_stream};
pub use fetch::{download_first, fetch_source};

/// Source resolution. Coarse is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceScale {
    #[default]
    Coarse,
    Fine,
}

impl FromStr for SourceScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coarse" | "110m" | "simplified" => Ok(SourceScale::Coarse),
            "fine" | "50m" | "full" => Ok(SourceScale::Fine),
            other => Err(format!("unknown SOURCE_SCALE `{other}` (expected coarse or fine)")),
        }
    }
}

impl fmt::Display for SourceScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceScale::Coarse => "coarse",
            SourceScale::Fine => "fine",
        })
    }
}

const NATURAL_EARTH_RAW: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson";
const NATURAL_EARTH_CDN: &str =
    "https://cdn.jsdelivr.net/gh/nvkelso/natural-earth-vector@master/geojson";
const FRANCE_GEOJSON_RAW: &str =
    "https://raw.githubusercontent.com/gregoiredavid/france-geojson/master";
const FRANCE_GEOJSON_CDN: &str = "https://cdn.jsdelivr.net/gh/gregoiredavid/france-geojson@master";

/// File name of the source document for a family and scale.
pub fn source_file_name(family: Family, scale: SourceScale) -> &'static str {
    match (family, scale) {
        (Family::Countries, SourceScale::Coarse) => "ne_110m_admin_0_countries.geojson",
        (Family::Countries, SourceScale::Fine) => "ne_50m_admin_0_countries.geojson",
        (Family::Departments, SourceScale::Coarse) => "departements-version-simplifiee.geojson",
        (Family::Departments, SourceScale::Fine) => "departements-avec-outre-mer.geojson",
    }
}

/// Ordered mirror list; the first reachable one wins.
pub fn default_mirrors(family: Family, scale: SourceScale) -> Vec<String> {
    let file = source_file_name(family, scale);
    let bases: &[&str] = match family {
        Family::Countries => &[NATURAL_EARTH_RAW, NATURAL_EARTH_CDN],
        Family::Departments => &[FRANCE_GEOJSON_RAW, FRANCE_GEOJSON_CDN],
    };
    bases.iter().map(|b| format!("{b}/{file}")).collect()
}

/// The URLs to try, in order: the override (if any), then the built-in
/// mirrors, without repeats.
pub fn source_urls(family: Family, scale: SourceScale, override_url: Option<&str>) -> Vec<String> {
    let mut urls: Vec<String> = override_url.map(str::to_string).into_iter().collect();
    for mirror in default_mirrors(family, scale) {
        if !urls.contains(&mirror) {
            urls.push(mirror);
        }
    }
    urls
}
