// crates/geotiles-core/src/output.rs

//! Files the build stage leaves in `out_dir/<family>/`:
//! `render.json` for the external renderer and the `metas.json` sidecar.
//! The renderer drops `{CODE}.svg` next to them.

use crate::collection::Family;
use crate::error::{GeoTilesError, Result};
use crate::projection::RenderMeta;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RENDER_FILE: &str = "render.json";
pub const SIDECAR_FILE: &str = "metas.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarEntry {
    pub code: String,
    pub name: String,
}

/// `{ generated_at, metas: { code -> { code, name } } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    pub generated_at: String,
    pub metas: BTreeMap<String, SidecarEntry>,
}

impl Sidecar {
    pub fn from_metas(metas: &[RenderMeta]) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            metas: metas
                .iter()
                .map(|m| {
                    (
                        m.code.clone(),
                        SidecarEntry {
                            code: m.code.clone(),
                            name: m.name.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

pub fn family_dir(out_dir: &Path, family: Family) -> PathBuf {
    out_dir.join(family.as_str())
}

/// Path the external renderer writes a feature's SVG to.
pub fn svg_path(out_dir: &Path, family: Family, code: &str) -> PathBuf {
    family_dir(out_dir, family).join(format!("{code}.svg"))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `render.json` and `metas.json`; returns the family directory.
pub fn write_outputs(out_dir: &Path, family: Family, metas: &[RenderMeta]) -> Result<PathBuf> {
    let dir = family_dir(out_dir, family);
    fs::create_dir_all(&dir)?;
    write_json(&dir.join(RENDER_FILE), &metas)?;
    write_json(&dir.join(SIDECAR_FILE), &Sidecar::from_metas(metas))?;
    Ok(dir)
}

/// Reads back the render metas a previous build wrote.
pub fn read_render_metas(out_dir: &Path, family: Family) -> Result<Vec<RenderMeta>> {
    let path = family_dir(out_dir, family).join(RENDER_FILE);
    let file = File::open(&path).map_err(|e| {
        GeoTilesError::NotFound(format!(
            "render metadata not found at {} ({e}); run `build` first",
            path.display()
        ))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
