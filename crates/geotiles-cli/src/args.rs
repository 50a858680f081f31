use clap::{Parser, Subcommand};
use geotiles_core::source::SourceScale;
use geotiles_core::Family;
use std::path::PathBuf;

/// CLI arguments for geotiles
#[derive(Debug, Parser)]
#[command(
    name = "geotiles",
    version,
    about = "Build framing metadata for boundary maps and publish the rendered tiles"
)]
pub struct CliArgs {
    /// Collection to work on: countries or departments
    #[arg(short = 'f', long = "family", global = true, default_value = "countries")]
    pub family: Family,

    /// Directory holding downloaded sources (overrides DATA_DIR)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory receiving render.json, metas.json and the SVGs (overrides OUT_DIR)
    #[arg(short = 'o', long = "out-dir", global = true)]
    pub out_dir: Option<PathBuf>,

    /// Preferred source URL, tried before the built-in mirrors (overrides SOURCE_URL)
    #[arg(long = "source-url", global = true)]
    pub source_url: Option<String>,

    /// Source resolution: coarse or fine (overrides SOURCE_SCALE)
    #[arg(long = "scale", global = true)]
    pub scale: Option<SourceScale>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download the source collection into the data directory
    Fetch {
        /// Download again even if the file is already present
        #[arg(long)]
        force: bool,
    },

    /// Load, normalize and frame every feature; write render.json + metas.json
    Build {
        /// Use this GeoJSON file instead of the fetched source
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },

    /// Show the framing of one feature from the last build
    Inspect {
        /// Feature code (e.g. FR, 2A, 971)
        code: String,
    },

    /// Upload the rendered SVGs and upsert one row per feature
    Publish,

    /// Delete every row of the family's table, then publish (needs DESTRUCTIVE_FLAG=1)
    Reseed,

    /// Check that the storage credential and the database belong to the same project
    CheckCredentials,
}
