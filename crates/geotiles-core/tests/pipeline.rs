// crates/geotiles-core/tests/pipeline.rs

mod common;

use common::{MemoryBlobs, MemoryRows};
use geotiles_core::guard::DestructiveGuard;
use geotiles_core::output::{read_render_metas, svg_path, Sidecar, SIDECAR_FILE};
use geotiles_core::pipeline::{build, Publisher};
use geotiles_core::sync::RetryPolicy;
use geotiles_core::{BuildReport, Config, Family, GeoTilesError, Stage};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn square(lon: f64, lat: f64, side: f64) -> serde_json::Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [lon, lat], [lon + side, lat], [lon + side, lat + side], [lon, lat + side], [lon, lat]
        ]]
    })
}

fn write_source(dir: &Path) -> std::path::PathBuf {
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "code": "971", "nom": "Guadeloupe" }, "geometry": square(-61.8, 15.9, 0.8) },
            { "type": "Feature", "properties": { "code": "75", "nom": "Paris" }, "geometry": square(2.25, 48.81, 0.17) },
            { "type": "Feature", "properties": { "code": "2A", "nom": "Corse-du-Sud" }, "geometry": square(8.5, 41.4, 0.9) },
            { "type": "Feature", "properties": { "code": "75", "nom": "Doublon" }, "geometry": square(0.0, 0.0, 1.0) }
        ]
    });
    let path = dir.join("departements.geojson");
    fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
    path
}

fn config(out: &Path) -> Config {
    Config {
        out_dir: out.to_path_buf(),
        concurrency: 2,
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            attempt_timeout: None,
        },
        chunk_size: 2,
        ..Config::default()
    }
}

/// Builds the fixture and drops a fake SVG for every framed feature.
fn build_with_svgs(tmp: &TempDir, cfg: &Config) -> BuildReport {
    let source = write_source(tmp.path());
    let report = build(cfg, Family::Departments, &source).unwrap();
    for meta in &report.metas {
        let path = svg_path(&cfg.out_dir, Family::Departments, &meta.code);
        fs::write(path, format!("<svg id=\"{}\"/>", meta.code)).unwrap();
    }
    report
}

#[test]
fn build_writes_render_metas_and_sidecar() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp.path().join("out"));
    let source = write_source(tmp.path());

    let report = build(&cfg, Family::Departments, &source).unwrap();
    let codes: Vec<&str> = report.metas.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(codes, vec!["2A", "75", "971"]);
    assert_eq!(report.load.duplicates, 1);

    let back = read_render_metas(&cfg.out_dir, Family::Departments).unwrap();
    assert_eq!(back.len(), 3);
    for (read, built) in back.iter().zip(&report.metas) {
        assert_eq!(read.code, built.code);
        assert!((read.projected.scale - built.projected.scale).abs() < 1e-9);
    }

    let sidecar: Sidecar = serde_json::from_slice(
        &fs::read(cfg.out_dir.join("departments").join(SIDECAR_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(sidecar.metas.len(), 3);
    assert_eq!(sidecar.metas["971"].name, "Guadeloupe");

    // Second run goes through the feature cache and frames identically.
    let again = build(&cfg, Family::Departments, &source).unwrap();
    assert_eq!(again.metas, report.metas);
}

#[test]
fn write_failure_reports_the_framed_count() {
    let tmp = TempDir::new().unwrap();
    // A regular file where the output directory should be.
    let blocked = tmp.path().join("out");
    fs::write(&blocked, b"not a directory").unwrap();
    let cfg = config(&blocked);
    let source = write_source(tmp.path());

    let err = build(&cfg, Family::Departments, &source).unwrap_err();
    assert_eq!(err.stage, Stage::Write);
    assert_eq!(err.succeeded, 3);
}

#[tokio::test]
async fn publish_uploads_then_upserts() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp.path().join("out"));
    let report = build_with_svgs(&tmp, &cfg);

    let blobs = Arc::new(MemoryBlobs::default());
    let rows = Arc::new(MemoryRows::default());
    let publisher = Publisher::new(&cfg, blobs.clone(), rows.clone());

    let out = publisher
        .publish(&cfg.out_dir, Family::Departments, &report.metas)
        .await
        .unwrap();

    assert_eq!(out.uploaded(), 3);
    assert_eq!(out.failed(), 0);
    assert_eq!(out.upserted, 3);
    assert_eq!(out.deleted, None);
    assert_eq!(blobs.ensure_calls.load(Ordering::SeqCst), 1);
    assert_eq!(blobs.keys(), vec!["svg/2A.svg", "svg/75.svg", "svg/971.svg"]);
    assert_eq!(rows.codes(), vec!["2A", "75", "971"]);
}

#[tokio::test]
async fn failed_uploads_are_reported_and_not_upserted() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp.path().join("out"));
    let report = build_with_svgs(&tmp, &cfg);

    let blobs = Arc::new(MemoryBlobs::failing(&["svg/75.svg"]));
    let rows = Arc::new(MemoryRows::default());
    let publisher = Publisher::new(&cfg, blobs.clone(), rows.clone());

    let out = publisher
        .publish(&cfg.out_dir, Family::Departments, &report.metas)
        .await
        .unwrap();

    assert_eq!(out.uploaded(), 2);
    assert_eq!(out.failed(), 1);
    let failed = out.sync.failures().next().unwrap();
    assert_eq!(failed.key, "svg/75.svg");
    assert_eq!(failed.attempts, 2);
    assert_eq!(rows.codes(), vec!["2A", "971"]);
}

#[tokio::test]
async fn missing_svg_stops_before_any_mutation() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp.path().join("out"));
    let report = build_with_svgs(&tmp, &cfg);
    fs::remove_file(svg_path(&cfg.out_dir, Family::Departments, "75")).unwrap();

    let blobs = Arc::new(MemoryBlobs::default());
    let rows = Arc::new(MemoryRows::default());
    let publisher = Publisher::new(&cfg, blobs.clone(), rows.clone());

    let err = publisher
        .publish(&cfg.out_dir, Family::Departments, &report.metas)
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Upload);
    assert!(matches!(err.source, GeoTilesError::NotFound(ref m) if m.contains("75")));
    assert_eq!(blobs.ensure_calls.load(Ordering::SeqCst), 0);
    assert!(blobs.keys().is_empty());
}

#[tokio::test]
async fn upsert_failure_names_the_stage_and_committed_rows() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp.path().join("out"));
    let report = build_with_svgs(&tmp, &cfg);

    let blobs = Arc::new(MemoryBlobs::default());
    let rows = Arc::new(MemoryRows::failing_from(1));
    let publisher = Publisher::new(&cfg, blobs, rows.clone());

    let err = publisher
        .publish(&cfg.out_dir, Family::Departments, &report.metas)
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Upsert);
    assert_eq!(err.succeeded, 2);
    assert_eq!(rows.codes().len(), 2);
}

#[tokio::test]
async fn reseed_is_refused_without_the_flag() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(&tmp.path().join("out"));
    let report = build_with_svgs(&tmp, &cfg);

    let blobs = Arc::new(MemoryBlobs::default());
    let rows = Arc::new(MemoryRows::default());
    let publisher = Publisher::new(&cfg, blobs.clone(), rows.clone());

    let err = publisher
        .reseed(&cfg.out_dir, Family::Departments, &report.metas)
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Safeguard);
    assert!(matches!(err.source, GeoTilesError::Safeguard { .. }));
    assert_eq!(rows.deletes.load(Ordering::SeqCst), 0);
    assert_eq!(rows.calls.load(Ordering::SeqCst), 0);
    assert_eq!(blobs.ensure_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reseed_deletes_then_republishes() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(&tmp.path().join("out"));
    cfg.guard = DestructiveGuard::from_flag(Some("1"));
    let report = build_with_svgs(&tmp, &cfg);

    let blobs = Arc::new(MemoryBlobs::default());
    let rows = Arc::new(MemoryRows::default());
    rows.rows
        .lock()
        .unwrap()
        .insert("13".into(), common::row("13"));
    let publisher = Publisher::new(&cfg, blobs, rows.clone());

    let out = publisher
        .reseed(&cfg.out_dir, Family::Departments, &report.metas)
        .await
        .unwrap();
    assert_eq!(out.deleted, Some(1));
    assert_eq!(out.upserted, 3);
    assert_eq!(rows.codes(), vec!["2A", "75", "971"]);
}
