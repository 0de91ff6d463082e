//! Rendering and recognizing the injected datastore script.
//!
//! The script body is produced from a small JavaScript template carrying a
//! marker comment, the datastore id as a literal `const` assignment, and the
//! read/write grants. Recognition is deliberately narrow: the marker, then
//! one `const datastoreId = "...";` assignment after it.

use std::sync::OnceLock;

use regex::Regex;

use super::credentials::DatastoreGrants;
use super::id::DatastoreId;

/// Substring identifying a script we injected.
pub const DATASTORE_MARKER: &str = "BEGIN TINYHOST DATASTORE SECTION";

const BUNDLED_TEMPLATE: &str = include_str!("../../assets/datastore_template.js");

const ID_PLACEHOLDER: &str = "{{ datastore_id }}";
const GET_URL_PLACEHOLDER: &str = "{{ presigned_get_url }}";
const POST_POLICY_PLACEHOLDER: &str = "{{ presigned_post_dict }}";

/// Placeholders as they must appear in the template. The id and URL are
/// quoted string literals, the policy is a bare object literal.
const REQUIRED: [&str; 3] = [
    "const datastoreId = \"{{ datastore_id }}\";",
    "\"{{ presigned_get_url }}\"",
    POST_POLICY_PLACEHOLDER,
];

const INDENT: &str = "    ";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("datastore template is missing the marker {DATASTORE_MARKER:?}")]
    MissingMarker,
    #[error("datastore template is missing placeholder {0}")]
    MissingPlaceholder(&'static str),
    #[error("failed to serialize write policy: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A validated datastore script template.
#[derive(Debug, Clone)]
pub struct DatastoreTemplate {
    source: String,
}

impl DatastoreTemplate {
    /// Validate a template. A template that fails here is a configuration
    /// problem and should stop the process before any page is touched.
    pub fn load(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        if !source.contains(DATASTORE_MARKER) {
            return Err(TemplateError::MissingMarker);
        }
        if let Some(missing) = REQUIRED.iter().find(|p| !source.contains(**p)) {
            return Err(TemplateError::MissingPlaceholder(missing));
        }
        Ok(Self { source })
    }

    /// The template compiled into this crate.
    pub fn bundled() -> Result<Self, TemplateError> {
        Self::load(BUNDLED_TEMPLATE)
    }

    /// Render the script body for `id` carrying `grants`.
    ///
    /// The result starts with a newline and every line is indented, so it
    /// sits neatly between `<script>` and `</script>` inside `<head>`.
    pub fn render(&self, id: &DatastoreId, grants: &DatastoreGrants) -> Result<String, TemplateError> {
        // `</` inside a script element would end it early
        let policy = serde_json::to_string(&grants.write_policy)?.replace("</", "<\\/");

        let script = self
            .source
            .replace(ID_PLACEHOLDER, id.as_str())
            .replace(GET_URL_PLACEHOLDER, grants.read_url.as_str())
            .replace(POST_POLICY_PLACEHOLDER, &policy);

        let indented = format!("\n{}", script).replace('\n', &format!("\n{}", INDENT));
        Ok(format!("{}\n", indented.trim_end()))
    }
}

fn id_assignment() -> &'static Regex {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    ASSIGNMENT.get_or_init(|| {
        Regex::new(r#"const datastoreId = "([A-Za-z0-9_]+)";"#).expect("datastore id pattern is valid")
    })
}

/// Recover the datastore id from a previously rendered script.
///
/// Returns `None` when the text is not one of ours or the assignment is
/// missing or unusable; callers treat that as "no id", never as an error.
pub fn extract_datastore_id(text: &str) -> Option<DatastoreId> {
    let (_, after_marker) = text.split_once(DATASTORE_MARKER)?;
    let captures = id_assignment().captures(after_marker)?;
    DatastoreId::parse(&captures[1]).ok()
}
