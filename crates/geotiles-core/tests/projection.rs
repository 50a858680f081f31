// crates/geotiles-core/tests/projection.rs

use geotiles_core::collection::{normalize_feature, LoadedFeature};
use geotiles_core::projection::{enforce_floor, fit, pad, project, PixelRect, ViewBox};
use geotiles_core::{BBox, Family, GeoTilesError, Geometry, LonLat, ProjectionSettings};

fn square_feature(code: &str, lon: f64, lat: f64, side: f64) -> LoadedFeature {
    LoadedFeature {
        code: code.into(),
        name: format!("Feature {code}"),
        alt_name: None,
        geometry: Geometry::Polygon(vec![vec![
            LonLat::new(lon, lat),
            LonLat::new(lon + side, lat),
            LonLat::new(lon + side, lat + side),
            LonLat::new(lon, lat + side),
            LonLat::new(lon, lat),
        ]]),
    }
}

fn contains(outer: &BBox, inner: &BBox) -> bool {
    outer.min.lon <= inner.min.lon
        && outer.min.lat <= inner.min.lat
        && outer.max.lon >= inner.max.lon
        && outer.max.lat >= inner.max.lat
}

#[test]
fn padding_grows_monotonically() {
    let b = BBox::new(-5.0, 41.0, 10.0, 51.0);
    assert_eq!(pad(&b, 0.0).unwrap(), b);

    let mut prev = b;
    for pct in [0.01, 0.05, 0.08, 0.2, 0.5] {
        let p = pad(&b, pct).unwrap();
        assert!(contains(&p, &prev), "pct {pct}: {p:?} does not contain {prev:?}");
        prev = p;
    }

    // pct × max(width, height) on each side.
    let p = pad(&b, 0.1).unwrap();
    assert!((p.min.lon - (-6.5)).abs() < 1e-9);
    assert!((p.max.lat - 52.5).abs() < 1e-9);
}

#[test]
fn bad_padding_is_rejected() {
    let b = BBox::new(0.0, 0.0, 1.0, 1.0);
    assert!(matches!(pad(&b, -0.1), Err(GeoTilesError::GeometryInvalid(_))));
    assert!(matches!(pad(&b, f64::NAN), Err(GeoTilesError::GeometryInvalid(_))));
}

#[test]
fn floor_lifts_tiny_boxes_around_their_center() {
    let b = BBox::new(2.3, 48.8, 2.4, 48.9);
    let f = enforce_floor(&b, 1.0).unwrap();
    assert!(f.width() >= 1.0);
    assert!(f.height() >= 1.0);
    assert!(contains(&f, &b));
    assert!((f.center().lon - b.center().lon).abs() < 1e-9);

    let big = BBox::new(0.0, 0.0, 5.0, 5.0);
    assert_eq!(enforce_floor(&big, 1.0).unwrap(), big);
}

#[test]
fn floor_holds_for_awkward_values() {
    for (c, floor) in [(179.9, 0.2), (-0.1, 0.3), (45.123_456_789, 0.7), (1e-9, 1.0)] {
        let b = BBox::new(c, c / 2.0, c, c / 2.0);
        let f = enforce_floor(&b, floor).unwrap();
        assert!(f.width() >= floor, "width {} < {floor}", f.width());
        assert!(f.height() >= floor, "height {} < {floor}", f.height());
    }
}

#[test]
fn fit_letterboxes_inside_target() {
    let target = PixelRect::new(16.0, 16.0, 1008.0, 1008.0);
    let wide = ViewBox {
        min_lon: 0.0,
        min_lat: 0.0,
        width: 20.0,
        height: 10.0,
    };
    let (fitted, scale) = fit(&wide, &target).unwrap();

    assert!((scale - 992.0 / 20.0).abs() < 1e-9);
    assert!((fitted.width() - 992.0).abs() < 1e-9);
    assert!((fitted.height() - 496.0).abs() < 1e-9);
    assert!(fitted.x0 >= target.x0 && fitted.x1 <= target.x1 + 1e-9);
    assert!(fitted.y0 >= target.y0 && fitted.y1 <= target.y1 + 1e-9);
    // Centered vertically.
    assert!(((fitted.y0 - target.y0) - (target.y1 - fitted.y1)).abs() < 1e-9);
}

#[test]
fn projection_invariants_hold_for_both_families() {
    for family in [Family::Countries, Family::Departments] {
        let settings = ProjectionSettings::for_family(family);
        for (code, side) in [("A", 0.01), ("B", 0.5), ("C", 12.0)] {
            let n = normalize_feature(square_feature(code, 3.0, 45.0, side)).unwrap();
            let meta = project(&n, &settings).unwrap();

            assert!(contains(&meta.bbox.padded, &meta.bbox.unwrapped));
            assert!(meta.bbox.padded.width() >= settings.min_extent_deg);
            assert!(meta.bbox.padded.height() >= settings.min_extent_deg);
            let vb = meta.projected.view_box;
            assert_eq!(vb.min_lon, meta.bbox.padded.min.lon);
            assert!((vb.width - meta.bbox.padded.width()).abs() < 1e-12);
            let t = settings.target_bounds;
            let f = meta.projected.fitted;
            assert!(f.x0 >= t.x0 - 1e-9 && f.x1 <= t.x1 + 1e-9);
            assert!(f.y0 >= t.y0 - 1e-9 && f.y1 <= t.y1 + 1e-9);
        }
    }
}

#[test]
fn projection_is_deterministic() {
    let settings = ProjectionSettings::for_family(Family::Departments);
    let n = normalize_feature(square_feature("2A", 8.5, 41.3, 0.9)).unwrap();
    let a = serde_json::to_string(&project(&n, &settings).unwrap()).unwrap();
    let b = serde_json::to_string(&project(&n, &settings).unwrap()).unwrap();
    assert_eq!(a, b);
}
