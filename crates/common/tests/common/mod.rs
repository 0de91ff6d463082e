//! Shared test utilities for datastore and publishing integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::datastore::{CredentialIssuer, DatastoreInjector, DatastoreTemplate};
use common::publish::{ConvertError, NotebookConverter, PublishOptions, Publisher};
use object_store::{MemoryStorage, PostPolicy};

pub const BUCKET: &str = "b";
pub const EMPTY_PAGE: &str = "<html><head></head><body><p>hello</p></body></html>";

/// A store whose clock is fixed, so repeated grants are byte-identical
pub fn frozen_store() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::frozen_at(
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap(),
    ))
}

pub fn injector(store: Arc<MemoryStorage>) -> DatastoreInjector {
    DatastoreInjector::new(
        CredentialIssuer::new(store),
        DatastoreTemplate::bundled().unwrap(),
    )
}

pub fn publisher(store: Arc<MemoryStorage>) -> Publisher {
    Publisher::new(store.clone(), injector(store))
}

pub fn options() -> PublishOptions {
    PublishOptions {
        bucket: Some(BUCKET.to_string()),
        ttl: Duration::from_secs(3600),
        ..PublishOptions::default()
    }
}

pub fn write_page(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// The write policy embedded in a page, read back the way the browser sees it
pub fn page_policy(html: &str) -> PostPolicy {
    let line = html
        .lines()
        .find_map(|l| l.trim().strip_prefix("const datastorePostPolicy = "))
        .unwrap();
    serde_json::from_str(line.trim_end_matches(';')).unwrap()
}

/// Stands in for nbconvert: writes a fixed page for any notebook.
#[derive(Debug)]
pub struct FakeConverter {
    pub page: String,
    pub calls: AtomicUsize,
    /// Every output directory the converter was handed
    pub output_dirs: Mutex<Vec<PathBuf>>,
}

impl FakeConverter {
    pub fn new(page: &str) -> Self {
        Self {
            page: page.to_string(),
            calls: AtomicUsize::new(0),
            output_dirs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NotebookConverter for FakeConverter {
    async fn convert(&self, notebook: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output_dirs.lock().unwrap().push(output_dir.to_path_buf());
        let stem = notebook.file_stem().unwrap().to_string_lossy();
        let page = output_dir.join(format!("{}.html", stem));
        std::fs::write(&page, &self.page).unwrap();
        Ok(page)
    }
}
