use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use object_store::{CreateOutcome, ObjectLocation, ObjectStorage, PostPolicy, StoreError};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default ceiling on a datastore upload: 2 MiB.
pub const MAX_DATASTORE_BYTES: u64 = 2 * 1024 * 1024;

const EMPTY_DATASTORE: &[u8] = b"{}";
const DATASTORE_CONTENT_TYPE: &str = "application/json";

/// Read and write access to one datastore object, both expiring together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatastoreGrants {
    pub read_url: Url,
    pub write_policy: PostPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("grant lifetime must be at least one second")]
    EmptyLifetime,
    #[error("datastore {location}: {source}")]
    Store {
        location: ObjectLocation,
        #[source]
        source: StoreError,
    },
}

/// Makes sure a datastore object exists and hands out grants for it.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn ObjectStorage>,
    max_write_bytes: u64,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn ObjectStorage>) -> Self {
        Self {
            store,
            max_write_bytes: MAX_DATASTORE_BYTES,
        }
    }

    pub fn with_max_write_bytes(mut self, max_write_bytes: u64) -> Self {
        self.max_write_bytes = max_write_bytes;
        self
    }

    /// Issue a read URL and a size-capped write policy for `location`, both
    /// valid for `ttl`. The object is created as `{}` first if it is missing.
    pub async fn issue(
        &self,
        location: &ObjectLocation,
        ttl: Duration,
    ) -> Result<DatastoreGrants, CredentialError> {
        if ttl.as_secs() == 0 {
            return Err(CredentialError::EmptyLifetime);
        }
        let at = |source| CredentialError::Store {
            location: location.clone(),
            source,
        };

        self.ensure_exists(location).await.map_err(at)?;

        let read_url = self
            .store
            .signed_read_url(location, ttl)
            .await
            .map_err(at)?;
        let write_policy = self
            .store
            .signed_write_policy(location, ttl, self.max_write_bytes)
            .await
            .map_err(at)?;

        Ok(DatastoreGrants {
            read_url,
            write_policy,
        })
    }

    async fn ensure_exists(&self, location: &ObjectLocation) -> Result<(), StoreError> {
        // Only a not-found answer means "create it"; anything else is surfaced
        if self.store.head_exists(location).await? {
            tracing::debug!(%location, "datastore exists");
            return Ok(());
        }

        let outcome = self
            .store
            .create_if_absent(
                location,
                Bytes::from_static(EMPTY_DATASTORE),
                DATASTORE_CONTENT_TYPE,
            )
            .await?;
        match outcome {
            CreateOutcome::Created => tracing::info!(%location, "created empty datastore"),
            CreateOutcome::AlreadyExists => {
                tracing::debug!(%location, "datastore was created concurrently")
            }
        }
        Ok(())
    }
}
