//! The client-side datastore a published page carries.
//!
//! Each page gets one JSON object in the bucket, named by an unguessable
//! id, plus a script in its `<head>` holding a read URL and a size-capped
//! write policy for that object.

mod credentials;
mod document;
mod id;
mod injector;
mod template;

pub use credentials::{CredentialError, CredentialIssuer, DatastoreGrants, MAX_DATASTORE_BYTES};
pub use document::{DocumentError, HtmlDocument, IdSource};
pub use id::{DatastoreId, DatastoreIdError, DATASTORE_ID_LEN};
pub use injector::{DatastoreInjector, InjectError, Injection};
pub use template::{extract_datastore_id, DatastoreTemplate, TemplateError, DATASTORE_MARKER};
