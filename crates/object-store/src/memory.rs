//! In-memory backend.
//!
//! Behaves like the S3 backend from the caller's side, including signed
//! URLs and POST policies, so the publishing pipeline can be exercised end to
//! end without a network. [`MemoryStorage::submit_post`] plays the part of
//! the S3 POST endpoint and enforces the policy conditions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::memory::InMemory;
use object_store::Attribute;
use parking_lot::Mutex;
use url::Url;

use crate::error::{Result, StoreError};
use crate::location::ObjectLocation;
use crate::policy::{PolicyCredential, PolicyRequest, PostPolicy};
use crate::storage::{BucketStore, CreateOutcome, ObjectStorage};

const MEMORY_REGION: &str = "memory";
const MEMORY_KEY_ID: &str = "memory";
const MEMORY_SECRET: &str = "memory-secret";

/// A stored object and the headers it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Object storage held in process memory, one [`InMemory`] per bucket.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: Mutex<HashMap<String, BucketStore>>,
    frozen_at: Option<DateTime<Utc>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose clock never moves, so every signature it issues is reproducible.
    pub fn frozen_at(now: DateTime<Utc>) -> Self {
        Self {
            buckets: Mutex::default(),
            frozen_at: Some(now),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.frozen_at.unwrap_or_else(Utc::now)
    }

    fn credential() -> PolicyCredential {
        PolicyCredential {
            key_id: MEMORY_KEY_ID.to_string(),
            secret_key: MEMORY_SECRET.to_string(),
            token: None,
        }
    }

    fn bucket(&self, name: &str) -> BucketStore {
        self.buckets
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| BucketStore::new(Arc::new(InMemory::new())))
            .clone()
    }

    fn object_url(&self, location: &ObjectLocation) -> Result<Url> {
        let mut url = Url::parse(&format!("memory://{}/", location.bucket))
            .map_err(|e| StoreError::InvalidLocation(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidLocation(location.to_string()))?
            .pop_if_empty()
            .extend(location.key.split('/'));
        Ok(url)
    }

    /// Submit a form upload the way a browser would, enforcing the policy.
    pub async fn submit_post(&self, policy: &PostPolicy, body: Bytes) -> Result<ObjectLocation> {
        let location = policy.authorize(
            &Self::credential(),
            MEMORY_REGION,
            self.now(),
            body.len() as u64,
        )?;
        self.bucket(&location.bucket)
            .put(&location, body, "application/json", None)
            .await?;
        Ok(location)
    }

    /// Read back an object with its headers.
    pub async fn object(&self, location: &ObjectLocation) -> Result<StoredObject> {
        let (body, attributes) = self.bucket(&location.bucket).get(location).await?;
        Ok(StoredObject {
            body,
            content_type: attributes
                .get(&Attribute::ContentType)
                .map(|v| v.as_ref().to_string()),
            cache_control: attributes
                .get(&Attribute::CacheControl)
                .map(|v| v.as_ref().to_string()),
        })
    }

    /// All keys in a bucket, sorted.
    pub async fn keys(&self, bucket: &str) -> Result<Vec<String>> {
        self.bucket(bucket).keys().await
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn head_exists(&self, location: &ObjectLocation) -> Result<bool> {
        self.bucket(&location.bucket).head_exists(location).await
    }

    async fn create_if_absent(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
    ) -> Result<CreateOutcome> {
        self.bucket(&location.bucket)
            .create_if_absent(location, body, content_type)
            .await
    }

    async fn signed_read_url(&self, location: &ObjectLocation, ttl: Duration) -> Result<Url> {
        let expires = self.now().timestamp() + ttl.as_secs() as i64;
        let mut url = self.object_url(location)?;
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string());
        Ok(url)
    }

    async fn signed_write_policy(
        &self,
        location: &ObjectLocation,
        ttl: Duration,
        max_bytes: u64,
    ) -> Result<PostPolicy> {
        let url = Url::parse(&format!("memory://{}/", location.bucket))
            .map_err(|e| StoreError::InvalidLocation(e.to_string()))?;
        let request = PolicyRequest {
            location,
            region: MEMORY_REGION,
            max_bytes,
            signed_at: self.now(),
            ttl,
        };
        PostPolicy::sign(url, &request, &Self::credential())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        location: &ObjectLocation,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.bucket(&location.bucket)
            .put_file(local_path, location, content_type, cache_control)
            .await
    }

    async fn download_to(&self, location: &ObjectLocation, local_path: &Path) -> Result<()> {
        self.bucket(&location.bucket)
            .download_to(location, local_path)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn frozen() -> MemoryStorage {
        MemoryStorage::frozen_at(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_head_and_create() {
        let store = MemoryStorage::new();
        let location = ObjectLocation::new("bucket", "abc.json");

        assert!(!store.head_exists(&location).await.unwrap());
        let outcome = store
            .create_if_absent(&location, Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::Created);
        assert!(store.head_exists(&location).await.unwrap());

        // A second creator loses the race without an error and without clobbering
        let outcome = store
            .create_if_absent(&location, Bytes::from_static(b"[]"), "application/json")
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);

        let object = store.object(&location).await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"{}"));
        assert_eq!(object.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let store = MemoryStorage::new();
        let a = ObjectLocation::new("a", "x.json");
        store
            .create_if_absent(&a, Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        assert!(!store
            .head_exists(&ObjectLocation::new("b", "x.json"))
            .await
            .unwrap());
        assert_eq!(store.keys("a").await.unwrap(), vec!["x.json".to_string()]);
        assert!(store.keys("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let store = MemoryStorage::new();
        let err = store
            .object(&ObjectLocation::new("bucket", "missing.html"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_signed_read_url_round_trips() {
        let store = frozen();
        let location = ObjectLocation::new("bucket", "site/page-0123456789ab.html");
        let url = store
            .signed_read_url(&location, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(url.scheme(), "memory");
        let expires: i64 = url
            .query_pairs()
            .find(|(k, _)| k == "expires")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        assert_eq!(expires, store.now().timestamp() + 3600);
        assert_eq!(store.locate(&url).unwrap(), location);
    }

    #[tokio::test]
    async fn test_post_policy_size_bound() {
        let store = frozen();
        let location = ObjectLocation::new("bucket", "abc.json");
        let policy = store
            .signed_write_policy(&location, Duration::from_secs(60), 16)
            .await
            .unwrap();

        let at_limit = Bytes::from(vec![b'x'; 16]);
        assert_eq!(
            store.submit_post(&policy, at_limit.clone()).await.unwrap(),
            location
        );
        assert_eq!(store.object(&location).await.unwrap().body, at_limit);

        let over = Bytes::from(vec![b'x'; 17]);
        let err = store.submit_post(&policy, over).await.unwrap_err();
        assert!(matches!(err, StoreError::PolicyViolation(_)));
        assert_eq!(store.object(&location).await.unwrap().body, at_limit);
    }

    #[tokio::test]
    async fn test_upload_and_download_file() {
        let store = MemoryStorage::new();
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("page.html");
        std::fs::write(&source, "<html></html>").unwrap();

        let location = ObjectLocation::new("bucket", "page-0123456789ab.html");
        store
            .upload_file(&source, &location, "text/html", "max-age=60, public")
            .await
            .unwrap();

        let object = store.object(&location).await.unwrap();
        assert_eq!(object.content_type.as_deref(), Some("text/html"));
        assert_eq!(object.cache_control.as_deref(), Some("max-age=60, public"));

        let target = temp_dir.path().join("copy.html");
        store.download_to(&location, &target).await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "<html></html>");
    }
}
