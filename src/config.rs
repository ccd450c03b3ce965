//! Registry configuration
//!
//! Loaded from a JSON file. Every field has a default so an empty object is a
//! valid configuration selecting the locked in-memory backend.
//!
//! ```json
//! {
//!   "storage": { "type": "mongodb", "uri": "mongodb://localhost:27017",
//!                "database": "aasregistry", "collection": "shells" },
//!   "logging": { "level": "debug", "json": true },
//!   "path_cache_capacity": 2048
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::document::DocumentRegistryStorage;
use crate::engine::EmbeddedCollection;
use crate::logging::LoggingConfig;
use crate::memory::LockingRegistryStorage;
use crate::paths::{PathCache, DEFAULT_CAPACITY};
use crate::storage::RegistryStorage;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Storage backend unavailable: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Descriptor objects behind a readers-writer lock
    #[default]
    InMemory,
    /// The embedded document engine, running the same compiled queries as MongoDB
    Document,
    Mongodb {
        uri: String,
        database: String,
        collection: String,
    },
}

impl StorageConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InMemory => "in-memory",
            Self::Document => "document",
            Self::Mongodb { .. } => "mongodb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Number of compiled paths kept before the cache is cleared
    #[serde(default = "default_path_cache_capacity")]
    pub path_cache_capacity: usize,
}

fn default_path_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            path_cache_capacity: default_path_cache_capacity(),
        }
    }
}

impl RegistryConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RegistryConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let StorageConfig::Mongodb {
            uri,
            database,
            collection,
        } = &self.storage
        {
            if uri.trim().is_empty() {
                return Err(ConfigError::Invalid("storage.uri must not be empty".into()));
            }
            if database.trim().is_empty() {
                return Err(ConfigError::Invalid("storage.database must not be empty".into()));
            }
            if collection.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "storage.collection must not be empty".into(),
                ));
            }
        }

        if !self.logging.is_valid_level() {
            return Err(ConfigError::Invalid(format!(
                "unknown logging.level '{}'",
                self.logging.level
            )));
        }

        if self.path_cache_capacity == 0 {
            return Err(ConfigError::Invalid("path_cache_capacity must be > 0".into()));
        }

        Ok(())
    }

    /// Applies the cache capacity and opens the configured backend
    pub fn build_storage(&self) -> ConfigResult<Box<dyn RegistryStorage>> {
        PathCache::global().set_capacity(self.path_cache_capacity);

        let storage: Box<dyn RegistryStorage> = match &self.storage {
            StorageConfig::InMemory => Box::new(LockingRegistryStorage::new()),
            StorageConfig::Document => {
                Box::new(DocumentRegistryStorage::new(EmbeddedCollection::new()))
            }
            StorageConfig::Mongodb {
                uri,
                database,
                collection,
            } => open_mongodb(uri, database, collection)?,
        };
        info!(backend = self.storage.name(), "STORAGE_OPENED");
        Ok(storage)
    }
}

#[cfg(feature = "mongodb")]
fn open_mongodb(
    uri: &str,
    database: &str,
    collection: &str,
) -> ConfigResult<Box<dyn RegistryStorage>> {
    let collection = crate::mongo::MongoCollection::connect(uri, database, collection)
        .map_err(|e| ConfigError::Backend(e.to_string()))?;
    Ok(Box::new(DocumentRegistryStorage::new(collection)))
}

#[cfg(not(feature = "mongodb"))]
fn open_mongodb(
    _uri: &str,
    _database: &str,
    _collection: &str,
) -> ConfigResult<Box<dyn RegistryStorage>> {
    Err(ConfigError::Backend(
        "built without the 'mongodb' feature".into(),
    ))
}
