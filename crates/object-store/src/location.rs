//! Addressing objects: bucket + key, and recovering both from URLs.

use std::fmt;

use object_store::path::Path as ObjectPath;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StoreError};

/// A single object in a single bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// Join a key prefix and an object name with a single `/`.
///
/// An empty prefix yields the bare name; stray slashes around the prefix
/// are dropped so `"site/"` and `"/site"` address the same objects.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The last path segment of the key.
    pub fn file_name(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[idx + 1..],
            None => &self.key,
        }
    }

    /// Everything in the key before the last `/`, or `""` at the bucket root.
    pub fn prefix(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[..idx],
            None => "",
        }
    }

    pub(crate) fn path(&self) -> ObjectPath {
        ObjectPath::from(self.key.as_str())
    }

    /// Recover the bucket and key behind a URL.
    ///
    /// Understands `s3://bucket/key`, `memory://bucket/key`, and both
    /// virtual-hosted (`https://bucket.s3.region.amazonaws.com/key`) and
    /// path-style (`https://s3.region.amazonaws.com/bucket/key`) AWS URLs.
    /// Query parameters, including any signature, are ignored.
    pub fn from_url(url: &Url) -> Result<Self> {
        let invalid = || StoreError::InvalidLocation(url.to_string());
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;

        match url.scheme() {
            "s3" | "memory" => Ok(Self::new(host, decode_key(url.path(), url)?)),
            "http" | "https" => {
                let service = host.strip_suffix(".amazonaws.com").ok_or_else(invalid)?;

                if let Some(idx) = service.rfind(".s3.").or_else(|| service.rfind(".s3-")) {
                    Ok(Self::new(&service[..idx], decode_key(url.path(), url)?))
                } else if let Some(bucket) = service.strip_suffix(".s3") {
                    Ok(Self::new(bucket, decode_key(url.path(), url)?))
                } else if service == "s3" || service.starts_with("s3.") || service.starts_with("s3-")
                {
                    Self::from_path_style(url.path(), url)
                } else {
                    Err(invalid())
                }
            }
            _ => Err(invalid()),
        }
    }

    /// Parse `/bucket/key...` relative to some endpoint.
    pub(crate) fn from_path_style(path: &str, url: &Url) -> Result<Self> {
        let path = path.trim_start_matches('/');
        match path.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() => {
                Ok(Self::new(bucket, decode_key(key, url)?))
            }
            _ => Err(StoreError::InvalidLocation(url.to_string())),
        }
    }
}

fn decode_key(raw: &str, url: &Url) -> Result<String> {
    let raw = raw.trim_start_matches('/');
    if raw.is_empty() {
        return Err(StoreError::InvalidLocation(url.to_string()));
    }
    let path = ObjectPath::from_url_path(raw)
        .map_err(|e| StoreError::InvalidLocation(format!("{}: {}", url, e)))?;
    Ok(path.to_string())
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}
