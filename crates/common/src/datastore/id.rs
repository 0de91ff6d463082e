//! Datastore identifiers.

use std::fmt;
use std::str::FromStr;

use object_store::join_key;
use serde::{Deserialize, Serialize};

/// Length of a freshly generated identifier
pub const DATASTORE_ID_LEN: usize = 20;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
/// Largest multiple of the alphabet size that fits in a byte; bytes at or
/// above it are discarded so every character is equally likely.
const REJECTION_BOUND: u8 = (256 - 256 % ALPHABET.len()) as u8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatastoreIdError {
    #[error("datastore id is empty")]
    Empty,
    #[error("datastore id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// The unguessable name of a page's datastore object.
///
/// Never derived from document content: a fresh id comes straight from the
/// operating system's CSPRNG.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatastoreId(String);

impl DatastoreId {
    /// Generate a new random identifier using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut id = String::with_capacity(DATASTORE_ID_LEN);
        let mut buff = [0u8; DATASTORE_ID_LEN * 2];

        while id.len() < DATASTORE_ID_LEN {
            getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
            for byte in buff.iter().filter(|b| **b < REJECTION_BOUND) {
                if id.len() == DATASTORE_ID_LEN {
                    break;
                }
                id.push(ALPHABET[*byte as usize % ALPHABET.len()] as char);
            }
        }

        Self(id)
    }

    /// Accept an identifier found in an existing page.
    ///
    /// Any non-empty run of word characters is allowed, not only the
    /// 20-character form we generate.
    pub fn parse(s: &str) -> Result<Self, DatastoreIdError> {
        if s.is_empty() {
            return Err(DatastoreIdError::Empty);
        }
        if let Some(c) = s.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(DatastoreIdError::InvalidCharacter(c));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the backing JSON object: `{prefix}/{id}.json`, or `{id}.json`
    /// when the prefix is empty.
    pub fn object_key(&self, prefix: &str) -> String {
        join_key(prefix, &format!("{}.json", self.0))
    }
}

impl fmt::Display for DatastoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatastoreId {
    type Err = DatastoreIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DatastoreId {
    type Error = DatastoreIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<DatastoreId> for String {
    fn from(id: DatastoreId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_shape() {
        let id = DatastoreId::generate();
        assert_eq!(id.as_str().len(), DATASTORE_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_does_not_repeat() {
        let ids: HashSet<_> = (0..1000).map(|_| DatastoreId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_rejection_bound() {
        assert_eq!(REJECTION_BOUND, 248);
        assert_eq!(REJECTION_BOUND as usize % ALPHABET.len(), 0);
    }

    #[test]
    fn test_parse() {
        assert!(DatastoreId::parse("abcXYZ019").is_ok());
        assert!(DatastoreId::parse("legacy_id").is_ok());
        assert_eq!(DatastoreId::parse(""), Err(DatastoreIdError::Empty));
        assert_eq!(
            DatastoreId::parse("bad\"id"),
            Err(DatastoreIdError::InvalidCharacter('"'))
        );
        assert!("a-b".parse::<DatastoreId>().is_err());
    }

    #[test]
    fn test_object_key() {
        let id = DatastoreId::parse("abc").unwrap();
        assert_eq!(id.object_key(""), "abc.json");
        assert_eq!(id.object_key("site"), "site/abc.json");
        assert_eq!(id.object_key("site/"), "site/abc.json");
    }

    #[test]
    fn test_serde_validates() {
        let id: DatastoreId = serde_json::from_str(r#""abc123""#).unwrap();
        assert_eq!(id.as_str(), "abc123");
        assert!(serde_json::from_str::<DatastoreId>(r#""a b""#).is_err());
    }
}
