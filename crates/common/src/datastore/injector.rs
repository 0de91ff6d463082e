use std::time::Duration;

use object_store::ObjectLocation;

use super::credentials::{CredentialError, CredentialIssuer};
use super::document::{DocumentError, HtmlDocument, IdSource};
use super::id::DatastoreId;
use super::template::{DatastoreTemplate, TemplateError};

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A page after its datastore section was written.
#[derive(Debug, Clone)]
pub struct Injection {
    pub html: String,
    pub datastore_id: DatastoreId,
    pub datastore: ObjectLocation,
    pub source: IdSource,
}

/// Gives a page its datastore: resolves the id, provisions the backing
/// object, and writes fresh grants into the page.
#[derive(Debug, Clone)]
pub struct DatastoreInjector {
    issuer: CredentialIssuer,
    template: DatastoreTemplate,
}

impl DatastoreInjector {
    pub fn new(issuer: CredentialIssuer, template: DatastoreTemplate) -> Self {
        Self { issuer, template }
    }

    pub async fn inject(
        &self,
        html: &str,
        bucket: &str,
        prefix: &str,
        ttl: Duration,
        reset: bool,
    ) -> Result<Injection, InjectError> {
        let document = HtmlDocument::parse(html)?;
        let (datastore_id, source) = document.resolve_datastore_id(reset);

        match &source {
            IdSource::Fresh => tracing::info!(%datastore_id, "writing new datastore section"),
            IdSource::Reused => tracing::info!(%datastore_id, "found existing datastore section, replacing"),
            IdSource::Reset { orphaned } => {
                // Other copies of the page may still read the old object
                if let Some(orphaned) = orphaned {
                    tracing::warn!(
                        bucket,
                        orphaned = %orphaned.object_key(prefix),
                        %datastore_id,
                        "datastore reset; previous object is left in place"
                    );
                }
            }
            IdSource::Malformed => tracing::warn!(
                %datastore_id,
                "existing datastore section has no readable id; generated a new one"
            ),
        }

        let datastore = ObjectLocation::new(bucket, datastore_id.object_key(prefix));
        let grants = self.issuer.issue(&datastore, ttl).await?;
        let body = self.template.render(&datastore_id, &grants)?;
        let html = document.with_section(&body)?;

        Ok(Injection {
            html,
            datastore_id,
            datastore,
            source,
        })
    }
}
