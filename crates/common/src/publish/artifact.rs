use object_store::join_key;
use sha1::{Digest, Sha1};

use super::input::SourceName;

/// Hex characters of the content hash kept in an artifact's name
pub const HASH_PREFIX_LEN: usize = 12;

/// Hex SHA-1 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// `{basename}-{hash prefix}{extension}`
pub fn artifact_name(name: &SourceName, bytes: &[u8]) -> String {
    let hash = content_hash(bytes);
    format!(
        "{}-{}{}",
        name.basename,
        &hash[..HASH_PREFIX_LEN],
        name.extension
    )
}

/// Key of an artifact under `prefix`; identical bytes always land on the same key.
pub fn artifact_key(prefix: &str, name: &SourceName, bytes: &[u8]) -> String {
    join_key(prefix, &artifact_name(name, bytes))
}
