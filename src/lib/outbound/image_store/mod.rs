//! `ImageStorePort` / `ReferenceHashStore` adapters over the object store.

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::pipeline::errors::{ImageStoreError, ReferenceHashError};
use crate::domain::pipeline::ports::{ImageStorePort, ReferenceHashStore};

/// Reference-hash record stored at `authentic-samples/{card-name}/{hash}.json`.
#[derive(Debug, Deserialize)]
struct ReferenceHashRecord {
    hash: String,
    #[allow(dead_code)]
    card_name: String,
    #[allow(dead_code)]
    variant: Option<String>,
    #[allow(dead_code)]
    set: Option<String>,
}

/// Fetches uploaded card images and reference hashes from an S3-compatible
/// object store reachable over HTTP: one `reqwest::Client`, one base URL.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

impl ImageStorePort for HttpObjectStore {
    async fn fetch(&self, image_ref: &str) -> Result<Vec<u8>, ImageStoreError> {
        let response = self
            .client
            .get(self.object_url(image_ref))
            .send()
            .await
            .context("image store request failed")
            .map_err(ImageStoreError::Unavailable)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ImageStoreError::NotFound(image_ref.to_string()));
        }
        if !response.status().is_success() {
            return Err(ImageStoreError::Unavailable(anyhow::anyhow!(
                "image store returned status {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .context("failed to read image bytes")
            .map_err(ImageStoreError::Unavailable)
    }
}

impl ReferenceHashStore for HttpObjectStore {
    async fn hashes_for(&self, card_name: &str) -> Result<Vec<String>, ReferenceHashError> {
        let key = format!("authentic-samples/{}/index.json", card_name.to_lowercase().replace(' ', "-"));

        let response = self
            .client
            .get(self.object_url(&key))
            .send()
            .await
            .context("reference hash index request failed")
            .map_err(ReferenceHashError::Unavailable)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(ReferenceHashError::Unavailable(anyhow::anyhow!(
                "reference hash store returned status {}",
                response.status()
            )));
        }

        let records: Vec<ReferenceHashRecord> = response
            .json()
            .await
            .context("reference hash index was not valid JSON")
            .map_err(ReferenceHashError::Unavailable)?;

        Ok(records.into_iter().map(|r| r.hash).collect())
    }
}
