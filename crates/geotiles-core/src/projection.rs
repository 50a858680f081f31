// crates/geotiles-core/src/projection.rs

//! # Projection Framing
//!
//! Derives the numbers an external SVG renderer needs to frame one feature:
//! a padded, floored view box in (unwrapped) degrees and the pixel rectangle
//! it is fitted into. Nothing here draws.
//!
//! Padding rule: each side of both axes grows by `pct × max(width, height)`.
//! Using the larger span keeps the visual border the same on every side,
//! whatever the feature's aspect ratio.

use crate::collection::{Family, NormalizedFeature};
use crate::error::{GeoTilesError, Result};
use crate::geometry::{BBox, LonLat};
use serde::{Deserialize, Serialize};

/// Pixel rectangle `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelRect {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Per-collection framing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSettings {
    pub padding_pct: f64,
    pub min_extent_deg: f64,
    pub target_bounds: PixelRect,
}

impl ProjectionSettings {
    pub fn for_family(family: Family) -> Self {
        match family {
            Family::Countries => Self {
                padding_pct: 0.08,
                min_extent_deg: 1.0,
                target_bounds: PixelRect::new(16.0, 16.0, 1008.0, 1008.0),
            },
            Family::Departments => Self {
                padding_pct: 0.08,
                min_extent_deg: 0.2,
                target_bounds: PixelRect::new(8.0, 8.0, 504.0, 504.0),
            },
        }
    }
}

/// Region of the source plane handed to the renderer, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub width: f64,
    pub height: f64,
}

impl From<BBox> for ViewBox {
    fn from(b: BBox) -> Self {
        Self {
            min_lon: b.min.lon,
            min_lat: b.min.lat,
            width: b.width(),
            height: b.height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBoxBlock {
    pub raw: BBox,
    pub unwrapped: BBox,
    pub unwrap_ref: f64,
    pub padded: BBox,
    pub padding_pct: f64,
    pub min_extent_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedBlock {
    pub view_box: ViewBox,
    pub target_bounds: PixelRect,
    /// The letterboxed rectangle inside `target_bounds` the view box maps onto.
    pub fitted: PixelRect,
    /// Pixels per degree.
    pub scale: f64,
}

/// Everything the external renderer needs for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderMeta {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
    pub centroid: LonLat,
    pub bbox: BBoxBlock,
    pub projected: ProjectedBlock,
}

fn ensure_valid(bbox: &BBox) -> Result<()> {
    if bbox.is_valid() {
        Ok(())
    } else {
        Err(GeoTilesError::GeometryInvalid(format!(
            "bbox [{}, {}, {}, {}] is inverted or non-finite",
            bbox.min.lon, bbox.min.lat, bbox.max.lon, bbox.max.lat
        )))
    }
}

/// Grows both axes by `pct × max(width, height)` on each side.
pub fn pad(bbox: &BBox, pct: f64) -> Result<BBox> {
    ensure_valid(bbox)?;
    if !pct.is_finite() || pct < 0.0 {
        return Err(GeoTilesError::GeometryInvalid(format!(
            "padding fraction {pct} must be finite and non-negative"
        )));
    }
    if pct == 0.0 {
        return Ok(*bbox);
    }
    let d = pct * bbox.width().max(bbox.height());
    Ok(BBox::new(
        bbox.min.lon - d,
        bbox.min.lat - d,
        bbox.max.lon + d,
        bbox.max.lat + d,
    ))
}

/// Widens any axis narrower than `min_extent_deg` around its center.
pub fn enforce_floor(bbox: &BBox, min_extent_deg: f64) -> Result<BBox> {
    ensure_valid(bbox)?;
    if !min_extent_deg.is_finite() || min_extent_deg < 0.0 {
        return Err(GeoTilesError::GeometryInvalid(format!(
            "minimum extent {min_extent_deg} must be finite and non-negative"
        )));
    }
    let c = bbox.center();
    let half = min_extent_deg / 2.0;
    let (min_lon, max_lon) = if bbox.width() < min_extent_deg {
        (c.lon - half, c.lon + half)
    } else {
        (bbox.min.lon, bbox.max.lon)
    };
    let (min_lat, max_lat) = if bbox.height() < min_extent_deg {
        (c.lat - half, c.lat + half)
    } else {
        (bbox.min.lat, bbox.max.lat)
    };
    let max_lon = reach_floor(min_lon, max_lon, min_extent_deg);
    let max_lat = reach_floor(min_lat, max_lat, min_extent_deg);
    Ok(BBox::new(min_lon, min_lat, max_lon, max_lat))
}

/// `c ± half` can round to a span a hair under the floor; nudge `hi` up
/// until `hi - lo >= floor` holds in floating point.
fn reach_floor(lo: f64, mut hi: f64, floor: f64) -> f64 {
    let mut nudge = f64::EPSILON * hi.abs().max(1.0);
    while hi - lo < floor {
        hi += nudge;
        nudge *= 2.0;
    }
    hi
}

/// Aspect-preserving, centered fit of `view_box` into `target`.
pub fn fit(view_box: &ViewBox, target: &PixelRect) -> Result<(PixelRect, f64)> {
    if !(view_box.width > 0.0 && view_box.height > 0.0) {
        return Err(GeoTilesError::GeometryInvalid(
            "view box must have a positive extent".into(),
        ));
    }
    if !(target.width() > 0.0 && target.height() > 0.0) {
        return Err(GeoTilesError::Validation(
            "target bounds must have a positive extent".into(),
        ));
    }
    let scale = (target.width() / view_box.width).min(target.height() / view_box.height);
    let w = view_box.width * scale;
    let h = view_box.height * scale;
    let x0 = target.x0 + (target.width() - w) / 2.0;
    let y0 = target.y0 + (target.height() - h) / 2.0;
    Ok((PixelRect::new(x0, y0, x0 + w, y0 + h), scale))
}

/// Pads, floors and fits one normalized feature.
pub fn project(feature: &NormalizedFeature, settings: &ProjectionSettings) -> Result<RenderMeta> {
    let padded = pad(&feature.bbox_unwrapped, settings.padding_pct)?;
    let padded = enforce_floor(&padded, settings.min_extent_deg)?;
    let view_box = ViewBox::from(padded);
    let (fitted, scale) = fit(&view_box, &settings.target_bounds)?;

    Ok(RenderMeta {
        code: feature.feature.code.clone(),
        name: feature.feature.name.clone(),
        alt_name: feature.feature.alt_name.clone(),
        centroid: feature.centroid,
        bbox: BBoxBlock {
            raw: feature.bbox_raw,
            unwrapped: feature.bbox_unwrapped,
            unwrap_ref: feature.unwrap_ref,
            padded,
            padding_pct: settings.padding_pct,
            min_extent_deg: settings.min_extent_deg,
        },
        projected: ProjectedBlock {
            view_box,
            target_bounds: settings.target_bounds,
            fitted,
            scale,
        },
    })
}
