/**
 * Client-side datastores for static pages.
 *  - Unguessable datastore ids
 *  - Provisioning the backing JSON object and
 *    issuing expiring read/write grants for it
 *  - Finding and rewriting the injected script
 */
pub mod datastore;
/**
 * Publishing pipeline: pages and notebooks in,
 *  signed links to content-addressed uploads out.
 */
pub mod publish;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::datastore::{
        CredentialIssuer, DatastoreGrants, DatastoreId, DatastoreInjector, DatastoreTemplate,
        HtmlDocument, IdSource, Injection, MAX_DATASTORE_BYTES,
    };
    pub use crate::publish::{
        Nbconvert, NotebookConverter, PublishError, PublishInput, PublishOptions, Published,
        Publisher, DEFAULT_GRANT_TTL, MAX_GRANT_TTL,
    };
    pub use crate::version::BuildInfo;
}
