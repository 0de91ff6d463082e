//! S3 (and S3-compatible) backend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder, S3ConditionalPut};
use object_store::signer::Signer;
use object_store::CredentialProvider;
use parking_lot::Mutex;
use url::Url;

use crate::error::{Result, StoreError};
use crate::location::ObjectLocation;
use crate::policy::{PolicyCredential, PolicyRequest, PostPolicy};
use crate::storage::{BucketStore, CreateOutcome, ObjectStorage};

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
struct BucketClient {
    s3: Arc<AmazonS3>,
    store: BucketStore,
}

/// Wrapper around one `AmazonS3` client per bucket, built on first use.
#[derive(Debug)]
pub struct S3Storage {
    endpoint: Option<Url>,
    region: String,
    credentials: Option<(String, String)>,
    clients: Mutex<HashMap<String, BucketClient>>,
}

impl S3Storage {
    /// Create the backend. Anything left unset is read from the AWS environment.
    pub fn new(
        endpoint: Option<String>,
        region: Option<String>,
        credentials: Option<(String, String)>,
    ) -> Result<Self> {
        let endpoint = endpoint
            .map(|e| {
                Url::parse(e.trim_end_matches('/'))
                    .map_err(|err| StoreError::InvalidConfig(format!("endpoint {}: {}", e, err)))
            })
            .transpose()?;

        let region = region
            .or_else(|| std::env::var("AWS_REGION").ok())
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Ok(Self {
            endpoint,
            region,
            credentials,
            clients: Mutex::default(),
        })
    }

    fn client(&self, bucket: &str) -> Result<BucketClient> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(bucket) {
            return Ok(client.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(&self.region)
            .with_conditional_put(S3ConditionalPut::ETagMatch);

        builder = match &self.endpoint {
            Some(endpoint) => builder
                .with_endpoint(endpoint.as_str().trim_end_matches('/'))
                .with_allow_http(endpoint.scheme() == "http")
                .with_virtual_hosted_style_request(false),
            None => builder.with_virtual_hosted_style_request(true),
        };

        if let Some((access_key, secret_key)) = &self.credentials {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);
        }

        let s3 = Arc::new(
            builder
                .build()
                .map_err(|e| StoreError::InvalidConfig(e.to_string()))?,
        );
        tracing::debug!(bucket, region = %self.region, "built S3 client");

        let client = BucketClient {
            store: BucketStore::new(s3.clone()),
            s3,
        };
        clients.insert(bucket.to_string(), client.clone());
        Ok(client)
    }

    /// Where browsers send form uploads for `bucket`.
    fn post_url(&self, bucket: &str) -> Result<Url> {
        let url = match &self.endpoint {
            Some(endpoint) => format!("{}/{}/", endpoint.as_str().trim_end_matches('/'), bucket),
            None => format!("https://{}.s3.{}.amazonaws.com/", bucket, self.region),
        };
        Url::parse(&url).map_err(|e| StoreError::InvalidConfig(format!("{}: {}", url, e)))
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3Storage {
    async fn head_exists(&self, location: &ObjectLocation) -> Result<bool> {
        self.client(&location.bucket)?
            .store
            .head_exists(location)
            .await
    }

    async fn create_if_absent(
        &self,
        location: &ObjectLocation,
        body: Bytes,
        content_type: &str,
    ) -> Result<CreateOutcome> {
        self.client(&location.bucket)?
            .store
            .create_if_absent(location, body, content_type)
            .await
    }

    async fn signed_read_url(&self, location: &ObjectLocation, ttl: Duration) -> Result<Url> {
        let client = self.client(&location.bucket)?;
        let url = client
            .s3
            .signed_url(Method::GET, &location.path(), ttl)
            .await?;
        Ok(url)
    }

    async fn signed_write_policy(
        &self,
        location: &ObjectLocation,
        ttl: Duration,
        max_bytes: u64,
    ) -> Result<PostPolicy> {
        let client = self.client(&location.bucket)?;
        let credential = client.s3.credentials().get_credential().await?;
        let credential = PolicyCredential {
            key_id: credential.key_id.clone(),
            secret_key: credential.secret_key.clone(),
            token: credential.token.clone(),
        };

        let request = PolicyRequest {
            location,
            region: &self.region,
            max_bytes,
            signed_at: Utc::now(),
            ttl,
        };
        PostPolicy::sign(self.post_url(&location.bucket)?, &request, &credential)
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        location: &ObjectLocation,
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        self.client(&location.bucket)?
            .store
            .put_file(local_path, location, content_type, cache_control)
            .await
    }

    async fn download_to(&self, location: &ObjectLocation, local_path: &Path) -> Result<()> {
        self.client(&location.bucket)?
            .store
            .download_to(location, local_path)
            .await
    }

    fn locate(&self, url: &Url) -> Result<ObjectLocation> {
        if let Some(endpoint) = &self.endpoint {
            if url.scheme() == endpoint.scheme() && url.host_str() == endpoint.host_str() {
                let base = endpoint.path().trim_end_matches('/');
                if let Some(rest) = url.path().strip_prefix(base) {
                    return ObjectLocation::from_path_style(rest, url);
                }
            }
        }
        ObjectLocation::from_url(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(endpoint: Option<&str>) -> S3Storage {
        S3Storage::new(
            endpoint.map(str::to_string),
            Some("eu-west-1".to_string()),
            Some(("AKID".to_string(), "secret".to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_post_url() {
        assert_eq!(
            storage(None).post_url("bucket").unwrap().as_str(),
            "https://bucket.s3.eu-west-1.amazonaws.com/"
        );
        assert_eq!(
            storage(Some("http://localhost:9000/"))
                .post_url("bucket")
                .unwrap()
                .as_str(),
            "http://localhost:9000/bucket/"
        );
    }

    #[test]
    fn test_locate_custom_endpoint() {
        let store = storage(Some("http://localhost:9000"));
        let url = Url::parse("http://localhost:9000/bucket/site/page.html?X-Amz-Expires=60").unwrap();
        assert_eq!(
            store.locate(&url).unwrap(),
            ObjectLocation::new("bucket", "site/page.html")
        );

        // AWS URLs still resolve
        let url = Url::parse("https://other.s3.amazonaws.com/page.html").unwrap();
        assert_eq!(
            store.locate(&url).unwrap(),
            ObjectLocation::new("other", "page.html")
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            S3Storage::new(Some("not a url".to_string()), None, None),
            Err(StoreError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_read_url_is_virtual_hosted() {
        let store = storage(None);
        let url = store
            .signed_read_url(
                &ObjectLocation::new("bucket", "site/page.html"),
                Duration::from_secs(3600),
            )
            .await
            .unwrap();
        assert_eq!(url.host_str(), Some("bucket.s3.eu-west-1.amazonaws.com"));
        assert_eq!(url.path(), "/site/page.html");
        assert!(url.query_pairs().any(|(k, v)| k == "X-Amz-Expires" && v == "3600"));
        assert_eq!(
            store.locate(&url).unwrap(),
            ObjectLocation::new("bucket", "site/page.html")
        );
    }

    #[tokio::test]
    async fn test_write_policy_uses_configured_credentials() {
        let store = storage(None);
        let policy = store
            .signed_write_policy(
                &ObjectLocation::new("bucket", "abc.json"),
                Duration::from_secs(60),
                2 * 1024 * 1024,
            )
            .await
            .unwrap();
        assert!(policy.fields["x-amz-credential"].starts_with("AKID/"));
        assert!(policy.fields["x-amz-credential"].contains("/eu-west-1/s3/"));
        assert_eq!(policy.url.as_str(), "https://bucket.s3.eu-west-1.amazonaws.com/");
    }
}
