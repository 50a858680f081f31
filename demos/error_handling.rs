//! Error handling example for geotiles-rs
//!
//! This example demonstrates which failures are fatal and which only skip
//! a feature.

use geotiles_core::collection::load_from_reader;
use geotiles_core::credentials::verify_same_project;
use geotiles_core::guard::DestructiveGuard;
use geotiles_core::prelude::*;

fn main() -> Result<()> {
    println!("=== GeoTiles-RS Error Handling Example ===\n");

    // Example 1: The top-level shape is fatal
    println!("--- Example 1: Not a FeatureCollection ---");
    match load_from_reader(&br#"{ "type": "Feature" }"#[..], Family::Countries) {
        Ok(_) => println!("  unexpectedly accepted"),
        Err(e) => println!("  ✗ {e}"),
    }
    println!();

    // Example 2: Individual features are skipped and counted
    println!("--- Example 2: Skipped features ---");
    let doc = br#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature", "properties": { "ISO_A2": "FR", "NAME": "France" },
          "geometry": { "type": "Polygon", "coordinates": [[[-5, 42], [8, 42], [8, 51], [-5, 51], [-5, 42]]] } },
        { "type": "Feature", "properties": { "ISO_A2": "-99", "NAME": "Northern Cyprus" },
          "geometry": { "type": "Polygon", "coordinates": [[[33, 35], [34, 35], [34, 35.6], [33, 35]]] } },
        { "type": "Feature", "properties": { "ISO_A2": "BE" }, "geometry": null }
      ]
    }"#;
    let (features, report) = load_from_reader(&doc[..], Family::Countries)?;
    println!("  ✓ loaded {} feature(s)", features.len());
    println!("    no geometry: {}", report.skipped_geometry);
    println!("    rejected codes: {}", report.rejected_codes);
    println!();

    // Example 3: Destructive operations need an explicit opt-in
    println!("--- Example 3: Destructive guard ---");
    let guard = DestructiveGuard::from_flag(std::env::var("DESTRUCTIVE_FLAG").ok().as_deref());
    match guard.assert_allowed("reseed", Some("table countries")) {
        Ok(()) => println!("  ✓ reseed allowed"),
        Err(e) => println!("  ✗ {e}"),
    }
    println!();

    // Example 4: Credentials for two different projects
    println!("--- Example 4: Credential check ---");
    match verify_same_project(
        "https://abcd1234.supabase.co",
        "opaque-key",
        "postgresql://postgres.wxyz9876:pw@aws-0-eu-west-3.pooler.supabase.com:6543/postgres",
    ) {
        Ok(project) => println!("  ✓ same project: {project}"),
        Err(e) => println!("  ✗ {e}"),
    }

    Ok(())
}
