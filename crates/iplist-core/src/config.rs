//! Service configuration types
//!
//! This module defines the settings of the service itself. The app catalog
//! (what to resolve) lives in [`crate::catalog`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Where the app catalog is loaded from
    pub catalog: ConfigSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ServiceConfig {
    /// Create a configuration reading the catalog from a local file
    pub fn with_local_catalog(path: impl Into<String>) -> Self {
        Self {
            catalog: ConfigSourceConfig::File { path: path.into() },
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.catalog.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Catalog source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigSourceConfig {
    /// Local JSON file
    File {
        /// Path to the catalog file
        path: String,
    },

    /// Object in the blob store, cached at a local path
    Remote {
        /// Bucket holding the catalog
        bucket: String,
        /// Object key of the catalog
        key: String,
        /// Local cache path (overwritten on every load)
        cache_path: String,
    },
}

impl ConfigSourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ConfigSourceConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Catalog path cannot be empty"));
                }
                Ok(())
            }
            ConfigSourceConfig::Remote {
                bucket,
                key,
                cache_path,
            } => {
                if bucket.is_empty() || key.is_empty() {
                    return Err(crate::Error::config(
                        "Remote catalog requires both a bucket and a key",
                    ));
                }
                if cache_path.is_empty() {
                    return Err(crate::Error::config(
                        "Remote catalog cache path cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            ConfigSourceConfig::File { .. } => "file",
            ConfigSourceConfig::Remote { .. } => "remote",
        }
    }
}

impl Default for ConfigSourceConfig {
    fn default() -> Self {
        ConfigSourceConfig::File {
            path: default_catalog_path(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of retries of a transient provider failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// First backoff delay (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Upper bound of a single backoff delay (in milliseconds)
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Timeout of a single provider call (in seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Region used for global APIs (hosted-zone records, blob store)
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Bucket used by static-file entries that do not name one
    #[serde(default)]
    pub default_bucket: Option<String>,

    /// Directory for local copies of static-file entries without a `localpath`
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_retries > 10 {
            return Err(crate::Error::config(format!(
                "max_retries must be at most 10. Got: {}",
                self.max_retries
            )));
        }
        if self.retry_base_ms > self.retry_max_ms {
            return Err(crate::Error::config(format!(
                "retry_base_ms ({}) cannot exceed retry_max_ms ({})",
                self.retry_base_ms, self.retry_max_ms
            )));
        }
        if !(1..=300).contains(&self.call_timeout_secs) {
            return Err(crate::Error::config(format!(
                "call_timeout_secs must be between 1 and 300. Got: {}",
                self.call_timeout_secs
            )));
        }
        if self.default_region.is_empty() {
            return Err(crate::Error::config("default_region cannot be empty"));
        }
        Ok(())
    }

    /// Per-call timeout as a `Duration`
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            default_region: default_region(),
            default_bucket: None,
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_catalog_path() -> String {
    "iplist_config/config.json".to_string()
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_base_ms() -> u64 {
    200
}

fn default_retry_max_ms() -> u64 {
    5_000
}

fn default_call_timeout_secs() -> u64 {
    10
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_cache_dir() -> String {
    "iplist_config".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::with_local_catalog("config.json");
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.max_retries, 3);
        assert_eq!(config.engine.call_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn engine_defaults_fill_missing_fields() {
        let engine: EngineConfig = serde_json::from_str(r#"{"max_retries": 1}"#).unwrap();
        assert_eq!(engine.max_retries, 1);
        assert_eq!(engine.default_region, "us-east-1");
        assert_eq!(engine.retry_max_ms, 5_000);
    }

    #[test]
    fn remote_source_requires_bucket_and_key() {
        let source = ConfigSourceConfig::Remote {
            bucket: "".to_string(),
            key: "config.json".to_string(),
            cache_path: "cache.json".to_string(),
        };
        assert!(source.validate().is_err());
        assert_eq!(source.type_name(), "remote");
    }

    #[test]
    fn out_of_range_engine_settings_are_rejected() {
        let mut engine = EngineConfig::default();
        engine.call_timeout_secs = 0;
        assert!(engine.validate().is_err());

        let mut engine = EngineConfig::default();
        engine.retry_base_ms = 10_000;
        assert!(engine.validate().is_err());
    }
}
