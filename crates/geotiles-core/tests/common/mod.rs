// crates/geotiles-core/tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use geotiles_core::storage::{BlobStore, UploadRequest};
use geotiles_core::upsert::{RowSink, TileRow};
use geotiles_core::{GeoTilesError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory bucket store. Keys listed in `fail_keys` always fail with a
/// transient error.
#[derive(Default)]
pub struct MemoryBlobs {
    pub ensure_calls: AtomicUsize,
    pub objects: Mutex<BTreeMap<(String, String), (Vec<u8>, String)>>,
    pub fail_keys: HashSet<String>,
}

impl MemoryBlobs {
    pub fn failing(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn ensure_bucket(&self, _bucket: &str) -> Result<()> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn upload(&self, request: UploadRequest<'_>) -> Result<()> {
        if self.fail_keys.contains(request.key) {
            return Err(GeoTilesError::Storage {
                status: 503,
                message: "unavailable".into(),
            });
        }
        self.objects.lock().unwrap().insert(
            (request.bucket.to_string(), request.key.to_string()),
            (request.body, request.content_type.to_string()),
        );
        Ok(())
    }
}

/// In-memory table store keyed by code. `fail_on_call` makes that
/// (zero-based) upsert call, and every later one, fail.
#[derive(Default)]
pub struct MemoryRows {
    pub rows: Mutex<BTreeMap<String, TileRow>>,
    pub calls: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_on_call: Option<usize>,
}

impl MemoryRows {
    pub fn failing_from(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn codes(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl RowSink for MemoryRows {
    async fn upsert_rows(&self, _table: &str, rows: &[TileRow]) -> Result<usize> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call.is_some_and(|n| call >= n) {
            return Err(GeoTilesError::Validation("constraint violated".into()));
        }
        let mut table = self.rows.lock().unwrap();
        for row in rows {
            table.insert(row.code.clone(), row.clone());
        }
        Ok(rows.len())
    }

    async fn delete_all(&self, _table: &str) -> Result<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut table = self.rows.lock().unwrap();
        let n = table.len() as u64;
        table.clear();
        Ok(n)
    }
}

pub fn row(code: &str) -> TileRow {
    TileRow {
        code: code.into(),
        name: format!("Name {code}"),
        alt_name: None,
        svg_key: format!("svg/{code}.svg"),
        centroid_lon: 0.0,
        centroid_lat: 0.0,
    }
}
