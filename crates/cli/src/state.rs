use std::{fs, path::PathBuf};

use common::datastore::MAX_DATASTORE_BYTES;
use common::publish::{Nbconvert, DEFAULT_GRANT_TTL};
use object_store::StorageConfig;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "tinyhost";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TinyhostConfig {
    /// Bucket to publish into when `--bucket` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Key prefix for published pages and their datastores
    pub prefix: String,
    /// Default lifetime of links and datastore grants, in seconds
    pub duration: u64,
    /// Write the injected page back over local `.html` inputs
    pub write_back: bool,
    /// Largest datastore upload a page may make, in bytes
    pub max_datastore_bytes: u64,
    pub nbconvert: Nbconvert,
    pub storage: StorageConfig,
}

impl Default for TinyhostConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            prefix: String::new(),
            duration: DEFAULT_GRANT_TTL.as_secs(),
            write_back: true,
            max_datastore_bytes: MAX_DATASTORE_BYTES,
            nbconvert: Nbconvert::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the tinyhost directory (~/.tinyhost)
    pub tinyhost_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: TinyhostConfig,
}

impl AppState {
    /// Get the tinyhost directory path (custom or default ~/.tinyhost)
    pub fn tinyhost_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Create the tinyhost directory and write its config file
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<TinyhostConfig>,
    ) -> Result<Self, StateError> {
        let tinyhost_dir = Self::tinyhost_dir(custom_path)?;
        let config_path = tinyhost_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&tinyhost_dir)?;

        let config = config.unwrap_or_default();
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            tinyhost_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the tinyhost directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let tinyhost_dir = Self::tinyhost_dir(custom_path)?;

        if !tinyhost_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = tinyhost_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config: TinyhostConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self {
            tinyhost_dir,
            config_path,
            config,
        })
    }

    /// Like [`AppState::load`], but an uninitialized directory means defaults.
    /// Nothing is written.
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        match Self::load(custom_path.clone()) {
            Err(StateError::NotInitialized) | Err(StateError::MissingFile(_)) => {
                let tinyhost_dir = Self::tinyhost_dir(custom_path)?;
                tracing::debug!(dir = %tinyhost_dir.display(), "no config found, using defaults");
                Ok(Self {
                    config_path: tinyhost_dir.join(CONFIG_FILE_NAME),
                    tinyhost_dir,
                    config: TinyhostConfig::default(),
                })
            }
            result => result,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("tinyhost directory not initialized. Run 'tinyhost init' first")]
    NotInitialized,

    #[error("tinyhost directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("tinyhost");

        let config = TinyhostConfig {
            bucket: Some("pages".to_string()),
            prefix: "site".to_string(),
            storage: StorageConfig::S3 {
                endpoint: Some("http://localhost:9000".to_string()),
                region: Some("eu-west-1".to_string()),
                access_key: None,
                secret_key: None,
            },
            ..TinyhostConfig::default()
        };
        let state = AppState::init(Some(dir.clone()), Some(config.clone())).unwrap();
        assert_eq!(state.config_path, dir.join(CONFIG_FILE_NAME));

        let loaded = AppState::load(Some(dir.clone())).unwrap();
        assert_eq!(loaded.config, config);

        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("absent");

        assert!(matches!(
            AppState::load(Some(dir.clone())),
            Err(StateError::NotInitialized)
        ));

        let state = AppState::load_or_default(Some(dir.clone())).unwrap();
        assert_eq!(state.config, TinyhostConfig::default());
        assert!(!dir.exists());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "bucket = \"pages\"\n\n[storage]\ntype = \"memory\"\n",
        )
        .unwrap();

        let config = AppState::load(Some(temp_dir.path().to_path_buf()))
            .unwrap()
            .config;
        assert_eq!(config.bucket.as_deref(), Some("pages"));
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.duration, 604_800);
        assert_eq!(config.max_datastore_bytes, 2 * 1024 * 1024);
        assert!(config.write_back);
        assert_eq!(config.nbconvert.program, "jupyter");
    }

    #[test]
    fn test_invalid_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "duration = \"soon\"").unwrap();

        assert!(matches!(
            AppState::load(Some(temp_dir.path().to_path_buf())),
            Err(StateError::TomlDe(_))
        ));
    }
}
