//! Basic usage example for geotiles-rs
//!
//! This example demonstrates how to:
//! - Load a GeoJSON FeatureCollection for one family
//! - Normalize features (centroid, raw and unwrapped bbox)
//! - Frame them for the renderer (padding, floor, letterboxed fit)

use geotiles_core::collection::load_from_reader;
use geotiles_core::prelude::*;

const DEPARTMENTS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "properties": { "code": "971", "nom": "Guadeloupe" },
      "geometry": { "type": "Polygon", "coordinates": [[[-61.81, 15.83], [-61.0, 15.83], [-61.0, 16.51], [-61.81, 16.51], [-61.81, 15.83]]] } },
    { "type": "Feature", "properties": { "code": "75", "nom": "Paris" },
      "geometry": { "type": "Polygon", "coordinates": [[[2.22, 48.81], [2.47, 48.81], [2.47, 48.90], [2.22, 48.90], [2.22, 48.81]]] } },
    { "type": "Feature", "properties": { "code": "2A", "nom": "Corse-du-Sud" },
      "geometry": { "type": "Polygon", "coordinates": [[[8.53, 41.36], [9.40, 41.36], [9.40, 42.38], [8.53, 42.38], [8.53, 41.36]]] } }
  ]
}"#;

fn main() -> Result<()> {
    println!("=== GeoTiles-RS Basic Usage Example ===\n");

    println!("--- Example 1: Load a collection ---");
    let (features, report) = load_from_reader(DEPARTMENTS.as_bytes(), Family::Departments)?;
    println!("Loaded {} of {} features", report.loaded, report.total);
    for f in &features {
        println!("  {} {}", f.code, f.name);
    }
    println!();

    println!("--- Example 2: Frame every feature ---");
    let settings = ProjectionSettings::for_family(Family::Departments);
    let (metas, skipped) = frame_features(features, &settings);
    for m in &metas {
        let v = &m.projected.view_box;
        println!(
            "  {:>3}  centroid ({:.3}, {:.3})  viewBox {:.3} {:.3} {:.3} {:.3}",
            m.code, m.centroid.lon, m.centroid.lat, v.min_lon, v.min_lat, v.width, v.height
        );
    }
    println!("  skipped: {}", skipped.len());
    println!();

    println!("--- Example 3: Small features get the minimum extent ---");
    if let Some(paris) = metas.iter().find(|m| m.code == "75") {
        println!(
            "  Paris unwrapped width {:.3}°, framed width {:.3}° (floor {}°)",
            paris.bbox.unwrapped.width(),
            paris.bbox.padded.width(),
            paris.bbox.min_extent_deg
        );
    }

    Ok(())
}
