use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use super::artifact::HASH_PREFIX_LEN;

/// URL schemes that name an already published artifact.
const PUBLISHED_SCHEMES: [&str; 4] = ["http", "https", "s3", "memory"];

/// Something to publish: a file on disk, or a link handed out earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishInput {
    Local(PathBuf),
    Published(Url),
}

impl FromStr for PublishInput {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Url::parse(s) {
            Ok(url) if PUBLISHED_SCHEMES.contains(&url.scheme()) => Ok(Self::Published(url)),
            _ => Ok(Self::Local(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for PublishInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Published(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `.html` / `.htm`
    Page,
    /// `.ipynb`, converted to a page before injection
    Notebook,
}

impl InputKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Page),
            "ipynb" => Some(Self::Notebook),
            _ => None,
        }
    }

    pub fn classify(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// The readable part of an artifact's name.
///
/// `Report.HTML` becomes basename `report`, extension `.html`; the published
/// key `site/report-0123456789ab.html` maps back to the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    pub basename: String,
    /// Lowercased, with the leading dot
    pub extension: String,
}

fn hash_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| {
        Regex::new(&format!("-[0-9a-f]{{{}}}$", HASH_PREFIX_LEN))
            .expect("hash suffix pattern is valid")
    })
}

impl SourceName {
    pub fn from_path(path: &Path) -> Option<Self> {
        let basename = path.file_stem()?.to_str()?.to_lowercase();
        let extension = path.extension()?.to_str()?.to_lowercase();
        if basename.is_empty() {
            return None;
        }
        Some(Self {
            basename,
            extension: format!(".{}", extension),
        })
    }

    /// Name of a published key with its content-hash suffix removed.
    pub fn from_published_key(key: &str) -> Option<Self> {
        let file_name = key.rsplit('/').next()?;
        let Self {
            basename,
            extension,
        } = Self::from_path(Path::new(file_name))?;

        let basename = hash_suffix().replace(&basename, "").into_owned();
        if basename.is_empty() {
            return None;
        }
        Some(Self {
            basename,
            extension,
        })
    }

    pub fn with_extension(self, extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            ..self
        }
    }
}
