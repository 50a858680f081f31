// crates/geotiles-core/src/geometry/normalize.rs

//! Centroid and bounding-box math.
//!
//! Longitudes are handled with one primitive, [`unwrap_lon`], which picks
//! the `v + 360·k` representative nearest to a reference. Everything that
//! has to survive the ±180° seam (ring continuity, centroid aggregation,
//! the unwrapped bbox) is expressed through it.

use super::{BBox, Extent, Geometry, LonLat};
use crate::error::{GeoTilesError, Result};

/// Areas below this are treated as zero (degenerate ring sets).
const AREA_EPSILON: f64 = 1e-12;

/// Returns the representative `v + 360·k` closest to `ref_lon`.
///
/// Ties keep `k = 0`, so a longitude that is within 180° of the reference
/// comes back bit-for-bit unchanged.
#[inline]
pub fn unwrap_lon(v: f64, ref_lon: f64) -> f64 {
    let d = v - ref_lon;
    if d.abs() <= 180.0 {
        return v;
    }
    let k = (-d / 360.0).round();
    let shifted = v + 360.0 * k;
    if (shifted - ref_lon).abs() < d.abs() {
        shifted
    } else {
        v
    }
}

/// Wraps a longitude into `(-180, 180]`. In-range values are returned as is.
#[inline]
pub fn wrap_lon(v: f64) -> f64 {
    if v > -180.0 && v <= 180.0 {
        return v;
    }
    let w = v.rem_euclid(360.0);
    if w > 180.0 {
        w - 360.0
    } else {
        w
    }
}

/// Min/max over every coordinate, without modification.
pub fn bbox_raw(geometry: &Geometry) -> Result<BBox> {
    let mut extent = Extent::new();
    for p in geometry.positions() {
        check_finite(p)?;
        extent.add(p.lon, p.lat);
    }
    extent
        .finish()
        .ok_or_else(|| GeoTilesError::GeometryInvalid("geometry has no coordinates".into()))
}

/// Min/max after moving every longitude to its representative nearest
/// `ref_lon`. Latitudes are untouched.
pub fn bbox_unwrapped(geometry: &Geometry, ref_lon: f64) -> Result<BBox> {
    if !ref_lon.is_finite() {
        return Err(GeoTilesError::GeometryInvalid(format!(
            "unwrap reference {ref_lon} is not finite"
        )));
    }
    let mut extent = Extent::new();
    for p in geometry.positions() {
        check_finite(p)?;
        extent.add(unwrap_lon(p.lon, ref_lon), p.lat);
    }
    extent
        .finish()
        .ok_or_else(|| GeoTilesError::GeometryInvalid("geometry has no coordinates".into()))
}

/// Signed area and centroid of one ring, computed in a continuous frame.
struct RingMoment {
    weight: f64,
    cx: f64,
    cy: f64,
}

/// Area-weighted centroid over all rings; holes subtract.
///
/// Rings are made longitude-continuous first, and ring centroids are pulled
/// next to the largest ring before averaging, so parts stored on both sides
/// of the antimeridian still average to a point between them. When the
/// total area vanishes the vertex mean is used instead.
pub fn centroid(geometry: &Geometry) -> Result<LonLat> {
    let mut moments: Vec<RingMoment> = Vec::new();
    let mut vertices: Vec<LonLat> = Vec::new();

    for polygon in geometry.polygons() {
        for (idx, ring) in polygon.iter().enumerate() {
            let pts = continuous(ring)?;
            vertices.extend_from_slice(&pts);
            if let Some((area, cx, cy)) = ring_moment(&pts) {
                let sign = if idx == 0 { 1.0 } else { -1.0 };
                moments.push(RingMoment {
                    weight: sign * area.abs(),
                    cx,
                    cy,
                });
            }
        }
    }

    if vertices.is_empty() {
        return Err(GeoTilesError::GeometryInvalid(
            "geometry has no coordinates".into(),
        ));
    }

    let total: f64 = moments.iter().map(|m| m.weight).sum();
    let c = if total.abs() > AREA_EPSILON {
        let anchor = moments
            .iter()
            .max_by(|a, b| a.weight.abs().total_cmp(&b.weight.abs()))
            .map(|m| m.cx)
            .unwrap_or(0.0);
        let (mut sx, mut sy) = (0.0, 0.0);
        for m in &moments {
            sx += m.weight * unwrap_lon(m.cx, anchor);
            sy += m.weight * m.cy;
        }
        LonLat::new(sx / total, sy / total)
    } else {
        vertex_mean(&vertices)
    };

    let c = LonLat::new(wrap_lon(c.lon), c.lat);
    if !c.is_finite() {
        return Err(GeoTilesError::GeometryInvalid(format!(
            "centroid is not finite ({}, {})",
            c.lon, c.lat
        )));
    }
    Ok(c)
}

fn check_finite(p: &LonLat) -> Result<()> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(GeoTilesError::GeometryInvalid(format!(
            "non-finite coordinate ({}, {})",
            p.lon, p.lat
        )))
    }
}

/// Copies the ring, shifting each longitude next to its predecessor.
fn continuous(ring: &[LonLat]) -> Result<Vec<LonLat>> {
    let mut out = Vec::with_capacity(ring.len());
    let mut prev: Option<f64> = None;
    for p in ring {
        check_finite(p)?;
        let lon = match prev {
            Some(prev) => unwrap_lon(p.lon, prev),
            None => p.lon,
        };
        prev = Some(lon);
        out.push(LonLat::new(lon, p.lat));
    }
    Ok(out)
}

/// Shoelace area and centroid, computed relative to the first vertex to
/// keep the products small. `None` for rings with no area.
fn ring_moment(pts: &[LonLat]) -> Option<(f64, f64, f64)> {
    if pts.len() < 3 {
        return None;
    }
    let origin = pts[0];
    let (mut a2, mut sx, mut sy) = (0.0, 0.0, 0.0);
    for i in 0..pts.len() {
        let p = pts[i];
        let q = pts[(i + 1) % pts.len()];
        let (x0, y0) = (p.lon - origin.lon, p.lat - origin.lat);
        let (x1, y1) = (q.lon - origin.lon, q.lat - origin.lat);
        let cross = x0 * y1 - x1 * y0;
        a2 += cross;
        sx += (x0 + x1) * cross;
        sy += (y0 + y1) * cross;
    }
    if a2.abs() <= AREA_EPSILON {
        return None;
    }
    let area = a2 / 2.0;
    Some((
        area,
        origin.lon + sx / (3.0 * a2),
        origin.lat + sy / (3.0 * a2),
    ))
}

fn vertex_mean(vertices: &[LonLat]) -> LonLat {
    let anchor = vertices[0].lon;
    let n = vertices.len() as f64;
    let (sx, sy) = vertices.iter().fold((0.0, 0.0), |(sx, sy), p| {
        (sx + unwrap_lon(p.lon, anchor), sy + p.lat)
    });
    LonLat::new(sx / n, sy / n)
}
