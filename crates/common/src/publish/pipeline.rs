use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use object_store::{ObjectLocation, ObjectStorage, StoreError};
use serde::Serialize;
use url::Url;

use super::artifact::artifact_key;
use super::input::{InputKind, PublishInput, SourceName};
use super::notebook::{ConvertError, Nbconvert, NotebookConverter};
use crate::datastore::{DatastoreId, DatastoreInjector, DocumentError, InjectError};

/// Longest lifetime of a published link or datastore grant: one week.
pub const MAX_GRANT_TTL: Duration = Duration::from_secs(604_800);
pub const DEFAULT_GRANT_TTL: Duration = MAX_GRANT_TTL;

/// Artifact keys encode their content, so a key's bytes never change
pub const PAGE_CACHE_CONTROL: &str = "max-age=31536000, public, immutable";

const NOTEBOOK_PAGE_EXTENSION: &str = ".html";

#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Required for local files; for published links it defaults to the link's bucket
    pub bucket: Option<String>,
    /// Defaults to empty for local files and to the link's directory for published links
    pub prefix: Option<String>,
    pub ttl: Duration,
    pub reset: bool,
    /// Write the injected page back over a local `.html`/`.htm` input
    pub write_back: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: None,
            ttl: DEFAULT_GRANT_TTL,
            reset: false,
            write_back: true,
        }
    }
}

/// Result of publishing one input.
#[derive(Debug, Clone, Serialize)]
pub struct Published {
    pub location: ObjectLocation,
    pub url: Url,
    pub datastore_id: DatastoreId,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{0}: use a .htm or .html extension for pages, or .ipynb for Jupyter notebooks")]
    UnsupportedExtension(String),
    #[error("{0}: no bucket given; pass --bucket or set one in the config")]
    MissingBucket(String),
    #[error("link duration must be between 1 and {max} seconds, got {0}", max = MAX_GRANT_TTL.as_secs())]
    InvalidTtl(u64),
    #[error("{input}: {reason}")]
    InvalidInput { input: String, reason: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Inject(#[from] InjectError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl PublishError {
    /// Problems with what the user asked for, as opposed to failures of the
    /// store, the converter or the local machine.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::UnsupportedExtension(_)
            | Self::MissingBucket(_)
            | Self::InvalidTtl(_)
            | Self::InvalidInput { .. }
            | Self::Read { .. } => true,
            Self::Inject(InjectError::Document(DocumentError::MissingHead)) => true,
            _ => false,
        }
    }
}

/// What a single publish works on once the input is resolved.
struct Source {
    path: PathBuf,
    kind: InputKind,
    name: SourceName,
    bucket: String,
    prefix: String,
    /// The user's own file, as opposed to a download
    local: bool,
}

/// Publishes pages: injects their datastore, uploads them under a
/// content-addressed key and hands back a signed link.
#[derive(Debug, Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStorage>,
    injector: DatastoreInjector,
    converter: Arc<dyn NotebookConverter>,
}

impl Publisher {
    pub fn new(store: Arc<dyn ObjectStorage>, injector: DatastoreInjector) -> Self {
        Self {
            store,
            injector,
            converter: Arc::new(Nbconvert::default()),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn NotebookConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Publish each input in turn. A failed input does not stop the others.
    pub async fn publish_all(
        &self,
        inputs: &[PublishInput],
        options: &PublishOptions,
    ) -> Vec<Result<Published, PublishError>> {
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let result = self.publish(input, options).await;
            if let Err(e) = &result {
                tracing::warn!(%input, error = %e, "failed to publish");
            }
            results.push(result);
        }
        results
    }

    pub async fn publish(
        &self,
        input: &PublishInput,
        options: &PublishOptions,
    ) -> Result<Published, PublishError> {
        let ttl = validate_ttl(options.ttl)?;

        // Downloads, conversions and the staged upload live here and are
        // removed when it drops, whichever way this returns
        let scratch = tempfile::Builder::new().prefix("tinyhost-").tempdir()?;

        let source = self.resolve(input, options, scratch.path()).await?;

        let page = match source.kind {
            InputKind::Page => source.path.clone(),
            InputKind::Notebook => {
                let output_dir = scratch.path().join("converted");
                tokio::fs::create_dir_all(&output_dir).await?;
                self.converter.convert(&source.path, &output_dir).await?
            }
        };
        let html = tokio::fs::read_to_string(&page)
            .await
            .map_err(|source| PublishError::Read {
                path: page.clone(),
                source,
            })?;

        let injection = self
            .injector
            .inject(&html, &source.bucket, &source.prefix, ttl, options.reset)
            .await?;

        if source.local && source.kind == InputKind::Page && options.write_back {
            tokio::fs::write(&source.path, &injection.html).await?;
            tracing::debug!(path = %source.path.display(), "wrote datastore section back to page");
        }

        let key = artifact_key(&source.prefix, &source.name, injection.html.as_bytes());
        let location = ObjectLocation::new(&source.bucket, key);
        let name = location.file_name().to_string();
        let staged = scratch.path().join(&name);
        tokio::fs::write(&staged, &injection.html).await?;

        let content_type = mime_guess::from_path(&name)
            .first_or(mime_guess::mime::TEXT_HTML)
            .to_string();
        self.store
            .upload_file(&staged, &location, &content_type, PAGE_CACHE_CONTROL)
            .await?;
        let url = self.store.signed_read_url(&location, ttl).await?;

        tracing::info!(
            %input,
            %location,
            datastore = %injection.datastore,
            "published"
        );

        Ok(Published {
            location,
            url,
            datastore_id: injection.datastore_id,
        })
    }

    /// Work out what to publish and where, without touching the store for
    /// anything it can reject first.
    async fn resolve(
        &self,
        input: &PublishInput,
        options: &PublishOptions,
        scratch: &Path,
    ) -> Result<Source, PublishError> {
        match input {
            PublishInput::Local(path) => {
                let kind = InputKind::classify(path)
                    .ok_or_else(|| PublishError::UnsupportedExtension(input.to_string()))?;
                let name = source_name(SourceName::from_path(path), kind, input)?;
                let bucket = options
                    .bucket
                    .clone()
                    .ok_or_else(|| PublishError::MissingBucket(input.to_string()))?;

                Ok(Source {
                    path: path.clone(),
                    kind,
                    name,
                    bucket,
                    prefix: options.prefix.clone().unwrap_or_default(),
                    local: true,
                })
            }
            PublishInput::Published(url) => {
                let location =
                    self.store
                        .locate(url)
                        .map_err(|e| PublishError::InvalidInput {
                            input: input.to_string(),
                            reason: e.to_string(),
                        })?;
                let kind = InputKind::classify(Path::new(location.file_name()))
                    .ok_or_else(|| PublishError::UnsupportedExtension(input.to_string()))?;
                let name = source_name(SourceName::from_published_key(&location.key), kind, input)?;

                let path = scratch.join(location.file_name());
                self.store.download_to(&location, &path).await?;
                tracing::debug!(%location, "downloaded published artifact");

                Ok(Source {
                    path,
                    kind,
                    name,
                    bucket: options
                        .bucket
                        .clone()
                        .unwrap_or_else(|| location.bucket.clone()),
                    prefix: options
                        .prefix
                        .clone()
                        .unwrap_or_else(|| location.prefix().to_string()),
                    local: false,
                })
            }
        }
    }
}

fn source_name(
    name: Option<SourceName>,
    kind: InputKind,
    input: &PublishInput,
) -> Result<SourceName, PublishError> {
    let name = name.ok_or_else(|| PublishError::InvalidInput {
        input: input.to_string(),
        reason: "cannot derive a file name".to_string(),
    })?;
    Ok(match kind {
        InputKind::Page => name,
        InputKind::Notebook => name.with_extension(NOTEBOOK_PAGE_EXTENSION),
    })
}

fn validate_ttl(ttl: Duration) -> Result<Duration, PublishError> {
    if ttl.as_secs() == 0 || ttl > MAX_GRANT_TTL {
        return Err(PublishError::InvalidTtl(ttl.as_secs()));
    }
    Ok(ttl)
}
