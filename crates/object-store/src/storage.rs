//! The object storage capability and its configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use object_store::{Attribute, Attributes, ObjectStore, PutMode, PutOptions};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StoreError};
use crate::location::ObjectLocation;
use crate::memory::MemoryStorage;
use crate::policy::PostPolicy;
use crate::s3::S3Storage;

/// Result of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// We wrote the object
    Created,
    /// Someone else got there first; their object was left alone
    AlreadyExists,
}

/// Everything tinyhost needs from an object store.
///
/// Implementations classify a missing object by error variant, never by
/// message text: [`ObjectStorage::head_exists`] answers `false` only for a
/// backend `NotFound`, and every other failure propagates.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync + std::fmt::Debug {
    /// Whether an object exists at the location.
    async fn head_exists(&self, location: &ObjectLocation) -> Result<bool>;

    /// Write `body` only if nothing exists at the location yet.
    async fn create_if_absent(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
    ) -> Result<CreateOutcome>;

    /// A URL anyone can GET the object with until `ttl` elapses.
    async fn signed_read_url(&self, location: &ObjectLocation, ttl: Duration) -> Result<Url>;

    /// A POST policy allowing uploads of at most `max_bytes` to the location
    /// until `ttl` elapses.
    async fn signed_write_policy(
        &self,
        location: &ObjectLocation,
        ttl: Duration,
        max_bytes: u64,
    ) -> Result<PostPolicy>;

    /// Upload a local file, overwriting whatever is at the location.
    async fn upload_file(
        &self,
        local_path: &Path,
        location: &ObjectLocation,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    /// Download an object into a local file.
    async fn download_to(&self, location: &ObjectLocation, local_path: &Path) -> Result<()>;

    /// Recover the location behind a URL previously handed out by this store.
    fn locate(&self, url: &Url) -> Result<ObjectLocation> {
        ObjectLocation::from_url(url)
    }
}

/// Configuration for the object storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// S3 or an S3-compatible service (MinIO, R2, ...)
    S3 {
        /// Custom endpoint URL (e.g., "http://localhost:9000" for MinIO).
        /// When unset, AWS virtual-hosted addressing is used.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
        /// Region; falls back to AWS_REGION / AWS_DEFAULT_REGION / us-east-1
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        /// Access key ID; falls back to the AWS environment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key: Option<String>,
        /// Secret access key; falls back to the AWS environment
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret_key: Option<String>,
    },

    /// In-memory storage (for testing and dry runs)
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::S3 {
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
        }
    }
}

/// Open the backend described by `config`.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
    let storage: Arc<dyn ObjectStorage> = match config {
        StorageConfig::S3 {
            endpoint,
            region,
            access_key,
            secret_key,
        } => {
            let credentials = match (access_key, secret_key) {
                (Some(access_key), Some(secret_key)) => {
                    Some((access_key.clone(), secret_key.clone()))
                }
                (None, None) => None,
                _ => {
                    return Err(StoreError::InvalidConfig(
                        "access_key and secret_key must be set together".to_string(),
                    ))
                }
            };
            Arc::new(S3Storage::new(
                endpoint.clone(),
                region.clone(),
                credentials,
            )?)
        }
        StorageConfig::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}

/// Plain object operations against one bucket, shared by the backends.
#[derive(Debug, Clone)]
pub(crate) struct BucketStore {
    inner: Arc<dyn ObjectStore>,
}

impl BucketStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub async fn head_exists(&self, location: &ObjectLocation) -> Result<bool> {
        match self.inner.head(&location.path()).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn create_if_absent(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
    ) -> Result<CreateOutcome> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            mode: PutMode::Create,
            attributes,
            ..Default::default()
        };

        match self.inner.put_opts(&location.path(), body.into(), opts).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(object_store::Error::AlreadyExists { .. }) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(StoreError::at(e, location)),
        }
    }

    pub async fn put(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
        cache_control: Option<&str>,
    ) -> Result<()> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        if let Some(cache_control) = cache_control {
            attributes.insert(Attribute::CacheControl, cache_control.to_string().into());
        }
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.inner
            .put_opts(&location.path(), body.into(), opts)
            .await
            .map_err(|e| StoreError::at(e, location))?;
        Ok(())
    }

    pub async fn put_file(
        &self,
        local_path: &Path,
        location: &ObjectLocation,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        let data = tokio::fs::read(local_path).await?;
        self.put(location, Bytes::from(data), content_type, Some(cache_control))
            .await
    }

    pub async fn get(&self, location: &ObjectLocation) -> Result<(Bytes, Attributes)> {
        let result = self
            .inner
            .get(&location.path())
            .await
            .map_err(|e| StoreError::at(e, location))?;
        let attributes = result.attributes.clone();
        let bytes = result.bytes().await.map_err(|e| StoreError::at(e, location))?;
        Ok((bytes, attributes))
    }

    pub async fn download_to(&self, location: &ObjectLocation, local_path: &Path) -> Result<()> {
        let (bytes, _) = self.get(location).await?;
        tokio::fs::write(local_path, &bytes).await?;
        Ok(())
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        use futures::TryStreamExt;

        let items: Vec<_> = self.inner.list(None).try_collect().await?;
        let mut keys: Vec<String> = items
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_s3() {
        assert!(matches!(
            StorageConfig::default(),
            StorageConfig::S3 { endpoint: None, .. }
        ));
    }

    #[test]
    fn test_config_serde() {
        let config: StorageConfig = serde_json::from_str(r#"{"type":"memory"}"#).unwrap();
        assert_eq!(config, StorageConfig::Memory);

        let config: StorageConfig =
            serde_json::from_str(r#"{"type":"s3","endpoint":"http://localhost:9000"}"#).unwrap();
        assert_eq!(
            config,
            StorageConfig::S3 {
                endpoint: Some("http://localhost:9000".to_string()),
                region: None,
                access_key: None,
                secret_key: None,
            }
        );
    }

    #[test]
    fn test_half_configured_credentials_rejected() {
        let config = StorageConfig::S3 {
            endpoint: None,
            region: None,
            access_key: Some("AKID".to_string()),
            secret_key: None,
        };
        assert!(matches!(
            open_storage(&config),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
