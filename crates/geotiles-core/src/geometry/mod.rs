// crates/geotiles-core/src/geometry/mod.rs

//! # Geometry
//!
//! Plain polygon types in longitude/latitude degrees, plus the
//! normalization math (centroid, raw and antimeridian-unwrapped bounding
//! boxes) in [`normalize`].

pub mod normalize;

use serde::{Deserialize, Serialize};

pub use normalize::{bbox_raw, bbox_unwrapped, centroid, unwrap_lon, wrap_lon};

/// A `(longitude, latitude)` pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Closed sequence of positions. The first position may or may not be
/// repeated at the end; both forms are accepted.
pub type Ring = Vec<LonLat>;

/// Outer ring first, then holes.
pub type Polygon = Vec<Ring>;

/// The two geometry kinds a boundary feature may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Every polygon of the geometry, regardless of kind.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(ps) => ps,
        }
    }

    /// Iterates every position of every ring of every polygon.
    pub fn positions(&self) -> impl Iterator<Item = &LonLat> + '_ {
        self.polygons().iter().flatten().flatten()
    }
}

/// Axis-aligned box in degrees. `min` is the south-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: LonLat,
    pub max: LonLat,
}

impl BBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min: LonLat::new(min_lon, min_lat),
            max: LonLat::new(max_lon, max_lat),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.lon - self.min.lon
    }

    pub fn height(&self) -> f64 {
        self.max.lat - self.min.lat
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.min.lon + self.max.lon) / 2.0,
            (self.min.lat + self.max.lat) / 2.0,
        )
    }

    /// `true` when all corners are finite and `max >= min` on both axes.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.max.lon >= self.min.lon
            && self.max.lat >= self.min.lat
    }
}

/// Running min/max accumulator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Extent {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
    seen: bool,
}

impl Extent {
    pub(crate) fn new() -> Self {
        Self {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
            seen: false,
        }
    }

    pub(crate) fn add(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.seen = true;
    }

    pub(crate) fn finish(self) -> Option<BBox> {
        self.seen
            .then(|| BBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat))
    }
}
