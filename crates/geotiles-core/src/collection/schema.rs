// crates/geotiles-core/src/collection/schema.rs

//! Attribute schema resolution and identity-code acceptance rules.

use super::raw::RawFeature;
use super::Family;
use crate::error::{GeoTilesError, Result};

/// Property names to read, fixed once per collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub code_key: String,
    pub name_key: String,
    pub alt_name_key: Option<String>,
}

/// Candidate property names per family, most preferred first.
struct Candidates {
    code: &'static [&'static str],
    name: &'static [&'static str],
    alt_name: &'static [&'static str],
}

const COUNTRY_CANDIDATES: Candidates = Candidates {
    // Natural Earth sets ISO_A2 to "-99" for a few countries; ISO_A2_EH does not.
    code: &["ISO_A2_EH", "ISO_A2", "iso_a2", "WB_A2"],
    name: &["NAME_FR", "NAME", "ADMIN", "name"],
    alt_name: &["NAME_EN", "NAME_LONG"],
};

const DEPARTMENT_CANDIDATES: Candidates = Candidates {
    code: &["code", "code_insee", "CODE_DEPT", "INSEE_DEP"],
    name: &["nom", "NOM_DEPT", "nom_dept", "name"],
    alt_name: &[],
};

fn candidates(family: Family) -> &'static Candidates {
    match family {
        Family::Countries => &COUNTRY_CANDIDATES,
        Family::Departments => &DEPARTMENT_CANDIDATES,
    }
}

impl Schema {
    /// Picks, for each attribute, the first candidate key that appears in
    /// any feature. A collection with no usable code or name key has an
    /// unrecognized shape and is rejected as a whole.
    pub fn resolve(family: Family, features: &[RawFeature]) -> Result<Self> {
        let c = candidates(family);
        let pick = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find(|k| features.iter().any(|f| f.has_property(k)))
                .map(|k| (*k).to_string())
        };

        let code_key = pick(c.code).ok_or_else(|| {
            GeoTilesError::Validation(format!(
                "unrecognized {family} schema: none of {:?} present",
                c.code
            ))
        })?;
        let name_key = pick(c.name).ok_or_else(|| {
            GeoTilesError::Validation(format!(
                "unrecognized {family} schema: none of {:?} present",
                c.name
            ))
        })?;

        Ok(Schema {
            code_key,
            name_key,
            alt_name_key: pick(c.alt_name),
        })
    }
}

/// Trims and uppercases a code. Idempotent.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Domain acceptance of an already-normalized code.
pub fn is_valid_code(family: Family, code: &str) -> bool {
    match family {
        Family::Countries => code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase()),
        Family::Departments => is_department_code(code),
    }
}

/// Mainland 01–19 and 21–95, Corsica 2A/2B, overseas 971–974 and 976.
fn is_department_code(code: &str) -> bool {
    match code {
        "2A" | "2B" => true,
        "971" | "972" | "973" | "974" | "976" => true,
        _ if code.len() == 2 && code.bytes().all(|b| b.is_ascii_digit()) => {
            match code.parse::<u8>() {
                Ok(n) => (1..=19).contains(&n) || (21..=95).contains(&n),
                Err(_) => false,
            }
        }
        _ => false,
    }
}
