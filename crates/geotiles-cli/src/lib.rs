//! geotiles-cli
//! ============
//!
//! Command-line interface for the `geotiles-core` pipeline.
//!
//! The crate's deliverable is the `geotiles` binary. This small library
//! target only exists so the overview below gets a rendered page.
//!
//! Quick start
//! -----------
//!
//! ```text
//! geotiles --family departments fetch
//! geotiles --family departments build
//! geotiles --family departments inspect 2A
//! STORAGE_URL=... STORAGE_CREDENTIALS=... DB_CONNECTION=... \
//!     geotiles --family departments publish
//! ```
//!
//! `build` stops at `render.json`: an external renderer turns it into one
//! `{CODE}.svg` per feature in the same directory, and `publish` picks
//! those up.
//!
//! All settings can come from the environment (`DATA_DIR`, `OUT_DIR`,
//! `SYNC_CONCURRENCY`, ...); the global flags override them. Logs go to
//! stderr and honor `RUST_LOG`.
#![cfg_attr(docsrs, feature(doc_cfg))]
