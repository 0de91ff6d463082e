use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use common::datastore::{CredentialIssuer, DatastoreInjector, DatastoreTemplate, TemplateError};
use common::publish::{PublishInput, PublishOptions, Publisher};
use object_store::{open_storage, StoreError};
use tinyhost_cli::state::{AppState, StateError, TinyhostConfig};

#[derive(Args, Debug, Clone)]
pub struct Publish {
    /// Pages (.html, .htm), notebooks (.ipynb) or links to already published pages
    #[arg(required = true)]
    pub inputs: Vec<PublishInput>,

    /// Bucket to publish local files into
    #[arg(long, env = "TINYHOST_BUCKET")]
    pub bucket: Option<String>,

    /// Key prefix for the page and its datastore
    #[arg(long)]
    pub prefix: Option<String>,

    /// Lifetime of the returned link and the datastore grants, in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=604_800))]
    pub duration: Option<u64>,

    /// Give each page a fresh datastore, orphaning the old one
    #[arg(long)]
    pub reset: bool,

    /// Leave local .html files untouched
    #[arg(long)]
    pub no_write_back: bool,
}

impl Publish {
    /// Flags win over the config file
    fn options(&self, config: &TinyhostConfig) -> PublishOptions {
        let prefix = self
            .prefix
            .clone()
            .or_else(|| (!config.prefix.is_empty()).then(|| config.prefix.clone()));

        PublishOptions {
            bucket: self.bucket.clone().or_else(|| config.bucket.clone()),
            prefix,
            ttl: Duration::from_secs(self.duration.unwrap_or(config.duration)),
            reset: self.reset,
            write_back: config.write_back && !self.no_write_back,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishOpError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("nothing was published")]
    AllFailed,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Publish {
    type Error = PublishOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppState::load_or_default(ctx.config_path.clone())?.config;

        let store = open_storage(&config.storage)?;
        let issuer =
            CredentialIssuer::new(store.clone()).with_max_write_bytes(config.max_datastore_bytes);
        let injector = DatastoreInjector::new(issuer, DatastoreTemplate::bundled()?);
        let publisher =
            Publisher::new(store, injector).with_converter(Arc::new(config.nbconvert.clone()));

        let options = self.options(&config);
        let results = publisher.publish_all(&self.inputs, &options).await;

        let mut urls = Vec::with_capacity(results.len());
        for (input, result) in self.inputs.iter().zip(results) {
            match result {
                Ok(published) => {
                    tracing::info!(
                        %input,
                        key = %published.location.key,
                        datastore_id = %published.datastore_id,
                        "published"
                    );
                    urls.push(published.url.to_string());
                }
                Err(e) => eprintln!("Error: {}: {}", input, e),
            }
        }

        if urls.is_empty() {
            return Err(PublishOpError::AllFailed);
        }
        Ok(urls.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::{Op, OpContext};
    use object_store::StorageConfig;

    fn publish(inputs: Vec<PublishInput>) -> Publish {
        Publish {
            inputs,
            bucket: None,
            prefix: None,
            duration: None,
            reset: false,
            no_write_back: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = TinyhostConfig {
            bucket: Some("configured".to_string()),
            prefix: "site".to_string(),
            duration: 60,
            ..TinyhostConfig::default()
        };

        let defaults = publish(vec![]).options(&config);
        assert_eq!(defaults.bucket.as_deref(), Some("configured"));
        assert_eq!(defaults.prefix.as_deref(), Some("site"));
        assert_eq!(defaults.ttl, Duration::from_secs(60));
        assert!(defaults.write_back);

        let flagged = Publish {
            bucket: Some("flag".to_string()),
            prefix: Some("other".to_string()),
            duration: Some(120),
            reset: true,
            no_write_back: true,
            ..publish(vec![])
        }
        .options(&config);
        assert_eq!(flagged.bucket.as_deref(), Some("flag"));
        assert_eq!(flagged.prefix.as_deref(), Some("other"));
        assert_eq!(flagged.ttl, Duration::from_secs(120));
        assert!(flagged.reset);
        assert!(!flagged.write_back);
    }

    #[test]
    fn test_empty_config_prefix_is_unset() {
        let options = publish(vec![]).options(&TinyhostConfig::default());
        assert_eq!(options.prefix, None);
        assert_eq!(options.bucket, None);
        assert_eq!(options.ttl, Duration::from_secs(604_800));
    }

    #[tokio::test]
    async fn test_publish_against_memory_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_dir = temp_dir.path().join("tinyhost");
        AppState::init(
            Some(config_dir.clone()),
            Some(TinyhostConfig {
                bucket: Some("pages".to_string()),
                storage: StorageConfig::Memory,
                ..TinyhostConfig::default()
            }),
        )
        .unwrap();

        let page = temp_dir.path().join("page.html");
        std::fs::write(&page, "<html><head></head><body></body></html>").unwrap();
        let notes = temp_dir.path().join("notes.txt");
        std::fs::write(&notes, "plain").unwrap();

        let ctx = OpContext::new(Some(config_dir));
        let output = publish(vec![PublishInput::Local(page.clone()), PublishInput::Local(notes)])
            .execute(&ctx)
            .await
            .unwrap();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("memory://pages/page-"));
        assert!(std::fs::read_to_string(&page)
            .unwrap()
            .contains("BEGIN TINYHOST DATASTORE SECTION"));
    }

    #[tokio::test]
    async fn test_all_inputs_failing_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_dir = temp_dir.path().join("tinyhost");
        AppState::init(
            Some(config_dir.clone()),
            Some(TinyhostConfig {
                storage: StorageConfig::Memory,
                ..TinyhostConfig::default()
            }),
        )
        .unwrap();

        let page = temp_dir.path().join("page.html");
        std::fs::write(&page, "<html><head></head></html>").unwrap();

        // No bucket anywhere
        let err = publish(vec![PublishInput::Local(page)])
            .execute(&OpContext::new(Some(config_dir)))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishOpError::AllFailed));
    }
}
