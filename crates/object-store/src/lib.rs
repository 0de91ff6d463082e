//! Object Storage Capability
//!
//! Everything tinyhost asks of an object store, behind one trait so the
//! publishing pipeline can run against S3 in production and an in-memory
//! store in tests.
//!
//! # Features
//!
//! - Existence checks that classify "not found" by error variant
//! - Race-safe create-if-absent
//! - Presigned GET URLs and size-bounded POST policies (SigV4)
//! - Recovering bucket + key from a previously issued URL
//! - S3 / S3-compatible and in-memory backends
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tinyhost_object_store::{open_storage, ObjectLocation, StorageConfig};
//!
//! # async fn example() -> Result<(), tinyhost_object_store::StoreError> {
//! let store = open_storage(&StorageConfig::default())?;
//! let location = ObjectLocation::new("my-bucket", "site/page.html");
//! let url = store.signed_read_url(&location, Duration::from_secs(3600)).await?;
//! println!("{}", url);
//! # Ok(())
//! # }
//! ```

mod error;
mod location;
mod memory;
mod policy;
mod s3;
mod storage;

pub use error::{Result, StoreError};
pub use location::{join_key, ObjectLocation};
pub use memory::{MemoryStorage, StoredObject};
pub use policy::{PolicyCredential, PolicyRequest, PostPolicy, POLICY_ALGORITHM};
pub use s3::S3Storage;
pub use storage::{open_storage, CreateOutcome, ObjectStorage, StorageConfig};
