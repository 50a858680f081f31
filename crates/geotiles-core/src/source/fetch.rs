// crates/geotiles-core/src/source/fetch.rs

use super::{source_file_name, source_urls};
use crate::collection::Family;
use crate::config::Config;
use crate::error::{GeoTilesError, Result};
use crate::sync::{retry, RetryPolicy};
use once_cell::sync::Lazy;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// One HTTP client per process; it pools connections across downloads.
static HTTP: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("geotiles/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(15))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Shared client, also handed to the blob store.
pub fn http_client() -> Client {
    HTTP.clone()
}

async fn download_once(client: &Client, url: &str) -> Result<Vec<u8>> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(match status.as_u16() {
            404 => GeoTilesError::NotFound(format!("{url} answered 404")),
            code => GeoTilesError::Storage {
                status: code,
                message: format!("download of {url} failed"),
            },
        });
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Tries each URL in order (with retry) and returns the first body fetched.
pub async fn download_first(
    client: &Client,
    urls: &[String],
    policy: &RetryPolicy,
) -> Result<(String, Vec<u8>)> {
    let mut failures: Vec<GeoTilesError> = Vec::new();
    for url in urls {
        let attempted = retry(policy, url, |_| download_once(client, url)).await;
        match attempted.result {
            Ok(bytes) => {
                info!(%url, bytes = bytes.len(), attempts = attempted.attempts, "downloaded source");
                return Ok((url.clone(), bytes));
            }
            Err(e) => {
                warn!(%url, attempts = attempted.attempts, error = %e, "mirror failed, trying next");
                failures.push(e);
            }
        }
    }
    Err(exhausted(failures))
}

/// Error for a download where every URL failed. A unanimous 404 stays
/// `NotFound`; anything else is reported as a network failure.
fn exhausted(failures: Vec<GeoTilesError>) -> GeoTilesError {
    let tried = failures.len();
    let all_missing = failures
        .iter()
        .all(|e| matches!(e, GeoTilesError::NotFound(_)));
    match failures.into_iter().last() {
        None => GeoTilesError::Network("no source URL configured".into()),
        Some(e) if all_missing => {
            GeoTilesError::NotFound(format!("none of {tried} source URLs has the file, last: {e}"))
        }
        Some(e) => GeoTilesError::Network(format!("all {tried} source URLs failed, last error: {e}")),
    }
}

/// Where the source file of a family lives inside the data directory.
pub fn source_path(config: &Config, family: Family) -> PathBuf {
    let name = match config.source_url.as_deref() {
        Some(url) => url_file_name(url).unwrap_or_else(|| source_file_name(family, config.source_scale).to_string()),
        None => source_file_name(family, config.source_scale).to_string(),
    };
    config.data_dir.join(family.as_str()).join(name)
}

fn url_file_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty()).then(|| last.to_string())
}

/// Downloads the family's source into the data directory unless it is
/// already there (or `force` is set). Returns the local path.
pub async fn fetch_source(config: &Config, family: Family, force: bool) -> Result<PathBuf> {
    let path = source_path(config, family);
    if !force && path.exists() {
        info!(path = %path.display(), "source already present, skipping download");
        return Ok(path);
    }

    let urls = source_urls(family, config.source_scale, config.source_url.as_deref());
    let (_, bytes) = download_first(&HTTP, &urls, &config.retry).await?;
    write_atomic(&path, &bytes).await?;
    Ok(path)
}

/// Writes through a temporary sibling so a crash never leaves half a file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("part");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanimous_404_stays_not_found() {
        let e = exhausted(vec![
            GeoTilesError::NotFound("a answered 404".into()),
            GeoTilesError::NotFound("b answered 404".into()),
        ]);
        assert!(matches!(e, GeoTilesError::NotFound(ref m) if m.contains("b answered 404")));
    }

    #[test]
    fn mixed_failures_are_network_errors() {
        let e = exhausted(vec![
            GeoTilesError::NotFound("a answered 404".into()),
            GeoTilesError::Storage { status: 503, message: "busy".into() },
        ]);
        assert!(matches!(e, GeoTilesError::Network(_)));
        assert!(matches!(exhausted(Vec::new()), GeoTilesError::Network(_)));
    }
}
