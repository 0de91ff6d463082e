//! Locating and rewriting the datastore section of an HTML page.
//!
//! Pages go through `lol_html`, a streaming rewriter: nothing outside the
//! rewritten `<script>` changes, byte for byte. A document is scanned once
//! on [`HtmlDocument::parse`] and rewritten once in
//! [`HtmlDocument::with_section`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, text, RewriteStrSettings};

use super::id::DatastoreId;
use super::template::{extract_datastore_id, DATASTORE_MARKER};

const HEAD: &str = "head";
/// Only direct children of `<head>` are considered
const HEAD_SCRIPT: &str = "head > script";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("could not find a <head> tag in the page; add one to host a datastore")]
    MissingHead,
    #[error("failed to rewrite page: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

/// Where the datastore id used for a page came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// The page had no datastore section
    Fresh,
    /// Taken from the page's existing section
    Reused,
    /// A reset was requested; `orphaned` is the id the page carried before
    Reset { orphaned: Option<DatastoreId> },
    /// The page had a section but its id could not be read
    Malformed,
}

/// A parsed page.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    source: String,
    head_closed: bool,
    /// Text of each direct `<script>` child of the first `<head>`, in
    /// document order
    head_scripts: Vec<String>,
    /// Index into `head_scripts` of the first script carrying the marker
    section: Option<usize>,
}

impl HtmlDocument {
    /// Scan `html` for its `<head>` and the scripts directly inside it.
    ///
    /// Makes no network calls; a page without `<head>` fails here.
    pub fn parse(html: impl Into<String>) -> Result<Self, DocumentError> {
        let source = html.into();

        let heads = Cell::new(0usize);
        // Set once the first head ends, explicitly or because an ancestor
        // closed it; only the first head's scripts are collected
        let head_ended = Rc::new(Cell::new(false));
        // Set only by a literal `</head>`
        let head_closed = Rc::new(Cell::new(false));
        let collecting = Cell::new(false);
        let scripts = RefCell::new(Vec::<String>::new());

        rewrite_str(
            &source,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!(HEAD, |el| {
                        heads.set(heads.get() + 1);
                        if heads.get() == 1 {
                            if let Some(handlers) = el.end_tag_handlers() {
                                let ended = head_ended.clone();
                                let closed = head_closed.clone();
                                handlers.push(Box::new(move |end| {
                                    ended.set(true);
                                    closed.set(end.name().eq_ignore_ascii_case(HEAD));
                                    Ok(())
                                }));
                            }
                        }
                        Ok(())
                    }),
                    element!(HEAD_SCRIPT, |_el| {
                        let in_first_head = !head_ended.get();
                        collecting.set(in_first_head);
                        if in_first_head {
                            scripts.borrow_mut().push(String::new());
                        }
                        Ok(())
                    }),
                    text!(HEAD_SCRIPT, |chunk| {
                        if collecting.get() {
                            if let Some(script) = scripts.borrow_mut().last_mut() {
                                script.push_str(chunk.as_str());
                            }
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )?;

        if heads.get() == 0 {
            return Err(DocumentError::MissingHead);
        }

        let head_scripts = scripts.into_inner();
        let section = head_scripts
            .iter()
            .position(|script| script.contains(DATASTORE_MARKER));
        let head_closed = head_closed.get();

        Ok(Self {
            source,
            head_closed,
            head_scripts,
            section,
        })
    }

    /// Text of the authoritative datastore section, if the page has one.
    ///
    /// When several scripts carry the marker only the first counts; the
    /// others are never read or rewritten.
    pub fn existing_section(&self) -> Option<&str> {
        self.section.map(|i| self.head_scripts[i].as_str())
    }

    /// Decide which datastore id the rewritten page will carry.
    pub fn resolve_datastore_id(&self, reset: bool) -> (DatastoreId, IdSource) {
        let Some(section) = self.existing_section() else {
            return (DatastoreId::generate(), IdSource::Fresh);
        };

        let existing = extract_datastore_id(section);
        if reset {
            return (
                DatastoreId::generate(),
                IdSource::Reset { orphaned: existing },
            );
        }
        match existing {
            Some(id) => (id, IdSource::Reused),
            None => (DatastoreId::generate(), IdSource::Malformed),
        }
    }

    /// The page with `body` as the content of its datastore section.
    ///
    /// Replaces the first marker-bearing script in place, or appends a new
    /// `<script>` to `<head>` when there is none.
    pub fn with_section(&self, body: &str) -> Result<String, DocumentError> {
        let rewritten = match self.section {
            Some(target) => {
                let seen = Cell::new(0usize);
                rewrite_str(
                    &self.source,
                    RewriteStrSettings {
                        element_content_handlers: vec![element!(HEAD_SCRIPT, |el| {
                            if seen.get() == target {
                                el.set_inner_content(body, ContentType::Html);
                            }
                            seen.set(seen.get() + 1);
                            Ok(())
                        })],
                        ..RewriteStrSettings::default()
                    },
                )?
            }
            None => {
                let script = format!("<script>{}</script>\n", body);
                let done = Cell::new(false);
                rewrite_str(
                    &self.source,
                    RewriteStrSettings {
                        element_content_handlers: vec![element!(HEAD, |el| {
                            if !done.replace(true) {
                                // Content appended to an element is emitted
                                // with its end tag, so an unclosed head gets
                                // the script at its start instead
                                if self.head_closed {
                                    el.append(&script, ContentType::Html);
                                } else {
                                    el.prepend(&script, ContentType::Html);
                                }
                            }
                            Ok(())
                        })],
                        ..RewriteStrSettings::default()
                    },
                )?
            }
        };
        Ok(rewritten)
    }
}
