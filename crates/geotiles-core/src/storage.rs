// crates/geotiles-core/src/storage.rs

//! # Blob Storage
//!
//! [`BlobStore`] is the seam the sync layer uploads through.
//! [`HttpBlobStore`] speaks the object-storage REST API
//! (`/storage/v1/bucket`, `/storage/v1/object/{bucket}/{key}`) with the
//! service credential as bearer token.

use crate::error::{GeoTilesError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";
pub const DEFAULT_CACHE_CONTROL: &str = "max-age=3600";

/// Object key of a feature's SVG.
pub fn svg_key(code: &str) -> String {
    format!("svg/{code}.svg")
}

/// One object write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub body: Vec<u8>,
    pub content_type: &'a str,
    pub cache_control: &'a str,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Creates the bucket unless it already exists.
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;

    /// Writes the object, overwriting any existing one under the same key.
    async fn upload(&self, request: UploadRequest<'_>) -> Result<()>;
}

/// REST client for the storage service.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    credential: String,
}

impl HttpBlobStore {
    pub fn new(client: Client, base_url: &str, credential: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.to_string(),
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.credential))
            .map_err(|_| GeoTilesError::Validation("storage credential is not a valid header".into()))?;
        let apikey = HeaderValue::from_str(&self.credential)
            .map_err(|_| GeoTilesError::Validation("storage credential is not a valid header".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("apikey", apikey);
        Ok(headers)
    }
}

async fn error_for(resp: reqwest::Response) -> GeoTilesError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    GeoTilesError::Storage { status, message }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let url = format!("{}/storage/v1/bucket/{bucket}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;
        if resp.status().is_success() {
            debug!(%bucket, "bucket exists");
            return Ok(());
        }
        // The service answers 400 or 404 for a missing bucket.
        if !matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            return Err(error_for(resp).await);
        }

        let url = format!("{}/storage/v1/bucket", self.base_url);
        let resp = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&json!({ "id": bucket, "name": bucket, "public": true }))
            .send()
            .await?;
        if resp.status().is_success() || resp.status() == StatusCode::CONFLICT {
            info!(%bucket, "bucket created");
            Ok(())
        } else {
            Err(error_for(resp).await)
        }
    }

    async fn upload(&self, request: UploadRequest<'_>) -> Result<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, request.bucket, request.key
        );
        let content_type = HeaderValue::from_str(request.content_type)
            .map_err(|_| GeoTilesError::Validation("invalid content type".into()))?;
        let cache_control = HeaderValue::from_str(request.cache_control)
            .map_err(|_| GeoTilesError::Validation("invalid cache-control value".into()))?;

        let resp = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, cache_control)
            .header("x-upsert", "true")
            .body(request.body)
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_for(resp).await)
        }
    }
}
