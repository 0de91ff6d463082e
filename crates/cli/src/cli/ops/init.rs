use clap::Args;

use common::publish::MAX_GRANT_TTL;
use object_store::StorageConfig;
use tinyhost_cli::state::{AppState, StateError, TinyhostConfig};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default bucket to publish into
    #[arg(long)]
    pub bucket: Option<String>,

    /// Default key prefix
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Default link lifetime in seconds
    #[arg(long, default_value_t = MAX_GRANT_TTL.as_secs(), value_parser = clap::value_parser!(u64).range(1..=604_800))]
    pub duration: u64,

    /// S3-compatible endpoint (e.g. http://localhost:9000 for MinIO)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Storage region (defaults to AWS_REGION, then us-east-1)
    #[arg(long)]
    pub region: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = TinyhostConfig {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
            duration: self.duration,
            storage: StorageConfig::S3 {
                endpoint: self.endpoint.clone(),
                region: self.region.clone(),
                access_key: None,
                secret_key: None,
            },
            ..TinyhostConfig::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized tinyhost directory at: {}\n\
             - Config: {}\n\
             - Bucket: {}\n\
             - Prefix: {}\n\
             - Link duration: {}s",
            state.tinyhost_dir.display(),
            state.config_path.display(),
            state.config.bucket.as_deref().unwrap_or("(none, pass --bucket)"),
            if state.config.prefix.is_empty() {
                "(none)"
            } else {
                state.config.prefix.as_str()
            },
            state.config.duration,
        );

        Ok(output)
    }
}
