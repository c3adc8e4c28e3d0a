//! Property image storage
//!
//! Images live in a public bucket of the hosted storage service. Property
//! records only keep object names; URLs are derived on read.

use crate::config::StorageConfig;
use crate::error::{ApiResult, AppError};
use crate::models::PropertyImage;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`
pub fn sanitize_file_name(name: &str) -> ApiResult<String> {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "-");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '-');
    if cleaned.is_empty() {
        return Err(AppError::BadRequest(format!("Invalid file name: '{}'", name)));
    }
    Ok(cleaned.to_string())
}

fn is_absolute_url(id: &str) -> bool {
    id.starts_with("https://") || id.starts_with("http://")
}

/// An object in the image bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredImage {
    pub name: String,
    pub url: String,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store a new object; an existing name is a conflict, never overwritten
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> ApiResult<StoredImage>;
    fn public_url(&self, name: &str) -> String;
    /// Returns whether an object was removed
    async fn delete(&self, name: &str) -> ApiResult<bool>;
    async fn list(&self) -> ApiResult<Vec<StoredImage>>;
}

/// Map stored image ids to display URLs
pub fn resolve_images(storage: &dyn ImageStorage, image_ids: &[String]) -> Vec<PropertyImage> {
    image_ids
        .iter()
        .map(|id| PropertyImage {
            id: id.clone(),
            url: if is_absolute_url(id) {
                id.clone()
            } else {
                storage.public_url(id)
            },
        })
        .collect()
}

/// Client for the hosted storage REST API
pub struct HostedStorage {
    base_url: String,
    bucket: String,
    service_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
}

impl HostedStorage {
    /// `None` when the base URL or service key is missing
    pub fn from_config(config: &StorageConfig) -> Option<Self> {
        let base_url = config.base_url.as_ref()?;
        let service_key = config.service_key.clone()?;
        Some(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            service_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        })
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    async fn failure(action: &str, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("Storage {} failed: HTTP {} {}", action, status, body);
        AppError::Storage(format!("{} failed with HTTP {}", action, status))
    }
}

fn is_duplicate(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT || body.contains("Duplicate") || body.contains("already exists")
}

#[async_trait]
impl ImageStorage for HostedStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> ApiResult<StoredImage> {
        let size = bytes.len();
        let response = self
            .authorized(self.client.post(self.object_url(name)))
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_duplicate(status, &body) {
                return Err(AppError::Conflict(format!("Image '{}' already exists", name)));
            }
            error!("Storage upload failed: HTTP {} {}", status, body);
            return Err(AppError::Storage(format!("Upload failed with HTTP {}", status)));
        }

        info!("Uploaded image {} ({} bytes)", name, size);
        Ok(StoredImage {
            name: name.to_string(),
            url: self.public_url(name),
        })
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    async fn delete(&self, name: &str) -> ApiResult<bool> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.delete(url))
            .json(&serde_json::json!({ "prefixes": [name] }))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::failure("Delete", response).await);
        }

        let removed: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Unexpected delete response: {}", e)))?;
        debug!("Deleted {} object(s) named {}", removed.len(), name);
        Ok(!removed.is_empty())
    }

    async fn list(&self) -> ApiResult<Vec<StoredImage>> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let response = self
            .authorized(self.client.post(url))
            .json(&serde_json::json!({
                "prefix": "",
                "limit": 1000,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" }
            }))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("List request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::failure("List", response).await);
        }

        let objects: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Unexpected list response: {}", e)))?;
        Ok(objects
            .into_iter()
            .map(|o| StoredImage {
                url: self.public_url(&o.name),
                name: o.name,
            })
            .collect())
    }
}

/// Process-local bucket for tests and database-less demo runs
pub struct MemoryStorage {
    bucket: String,
    objects: RwLock<BTreeMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl ImageStorage for MemoryStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> ApiResult<StoredImage> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(name) {
            return Err(AppError::Conflict(format!("Image '{}' already exists", name)));
        }
        objects.insert(name.to_string(), (bytes, content_type.to_string()));
        Ok(StoredImage {
            name: name.to_string(),
            url: self.public_url(name),
        })
    }

    fn public_url(&self, name: &str) -> String {
        format!("memory://{}/{}", self.bucket, name)
    }

    async fn delete(&self, name: &str) -> ApiResult<bool> {
        Ok(self.objects.write().await.remove(name).is_some())
    }

    async fn list(&self) -> ApiResult<Vec<StoredImage>> {
        let objects = self.objects.read().await;
        Ok(objects
            .keys()
            .map(|name| StoredImage {
                name: name.clone(),
                url: self.public_url(name),
            })
            .collect())
    }
}
