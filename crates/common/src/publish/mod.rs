//! Content-addressed publishing of pages and notebooks.

mod artifact;
mod input;
mod notebook;
mod pipeline;

pub use artifact::{artifact_key, artifact_name, content_hash, HASH_PREFIX_LEN};
pub use input::{InputKind, PublishInput, SourceName};
pub use notebook::{ConvertError, Nbconvert, NotebookConverter};
pub use pipeline::{
    PublishError, PublishOptions, Published, Publisher, DEFAULT_GRANT_TTL, MAX_GRANT_TTL,
    PAGE_CACHE_CONTROL,
};
