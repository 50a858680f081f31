// crates/geotiles-core/src/guard.rs

//! Opt-in gate for irreversible mutations.

use crate::error::{GeoTilesError, Result};

/// Name of the environment variable the flag is read from.
pub const DESTRUCTIVE_FLAG: &str = "DESTRUCTIVE_FLAG";

/// Holds the destructive-operation opt-in, decided once from the flag value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestructiveGuard {
    enabled: bool,
}

impl DestructiveGuard {
    /// `"1"`, `"true"` and `"yes"` (any case, surrounding whitespace ignored)
    /// enable the guard; anything else, including no value, leaves it closed.
    pub fn from_flag(value: Option<&str>) -> Self {
        let enabled = value
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
            })
            .unwrap_or(false);
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Fails with [`GeoTilesError::Safeguard`] unless destructive operations
    /// were opted into. Call before the first mutating request.
    pub fn assert_allowed(&self, operation: &str, details: Option<&str>) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        Err(GeoTilesError::Safeguard {
            operation: operation.to_string(),
            scope: details.map(str::to_string),
        })
    }
}
