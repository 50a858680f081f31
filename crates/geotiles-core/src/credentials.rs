// crates/geotiles-core/src/credentials.rs

//! Pass/fail check that the storage credential and the database connection
//! target the same project.
//!
//! The project reference is read from:
//! - the storage URL host (`<ref>.supabase.co` style: first DNS label),
//! - the `ref` claim of the storage credential when it is a JWT,
//! - the database user (`postgres.<ref>`) or host (`db.<ref>.<domain>`).

use crate::error::{GeoTilesError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Url;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "ref")]
    project_ref: Option<String>,
}

/// Project reference embedded in a JWT payload, if any.
pub fn project_from_jwt(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.project_ref.filter(|r| !r.is_empty())
}

/// First DNS label of the storage URL host.
pub fn project_from_storage_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;
    let (label, rest) = host.split_once('.')?;
    (!label.is_empty() && rest.contains('.')).then(|| label.to_string())
}

/// Project reference of a Postgres connection string.
pub fn project_from_db_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    if let Some(project) = url.username().strip_prefix("postgres.") {
        if !project.is_empty() {
            return Some(project.to_string());
        }
    }
    let host = url.host_str()?;
    let rest = host.strip_prefix("db.")?;
    let (label, _) = rest.split_once('.')?;
    (!label.is_empty()).then(|| label.to_string())
}

/// Fails with [`GeoTilesError::CredentialMismatch`] unless every derivable
/// project reference agrees and both sides yield one.
pub fn verify_same_project(storage_url: &str, storage_credential: &str, db_url: &str) -> Result<String> {
    let storage = project_from_storage_url(storage_url).ok_or_else(|| {
        GeoTilesError::CredentialMismatch(format!(
            "cannot determine the project of storage URL {storage_url}"
        ))
    })?;
    let db = project_from_db_url(db_url).ok_or_else(|| {
        GeoTilesError::CredentialMismatch("cannot determine the project of DB_CONNECTION".into())
    })?;

    if let Some(claimed) = project_from_jwt(storage_credential) {
        if claimed != storage {
            return Err(GeoTilesError::CredentialMismatch(format!(
                "storage credential belongs to `{claimed}`, storage URL to `{storage}`"
            )));
        }
    }
    if storage != db {
        return Err(GeoTilesError::CredentialMismatch(format!(
            "storage targets `{storage}`, database targets `{db}`"
        )));
    }

    info!(project = %storage, "credentials target the same project");
    Ok(storage)
}
