// # Remote Config Source
//
// Downloads the catalog from the blob store on every load and keeps a
// local copy. The download runs under a `RetryPolicy`. When it still
// fails, the last local copy is used.

use async_trait::async_trait;
use std::sync::Arc;

use crate::catalog::AppCatalog;
use crate::error::Result;
use crate::pipeline::RetryPolicy;
use crate::store::file::{write_atomically, FileConfigSource};
use crate::traits::{BlobStore, ConfigSource};

/// Catalog object in the blob store, cached in a local file
pub struct RemoteConfigSource {
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    key: String,
    cache: FileConfigSource,
    policy: RetryPolicy,
}

impl RemoteConfigSource {
    /// # Parameters
    ///
    /// - `blobs`: Store holding the catalog object
    /// - `bucket`, `key`: Location of the catalog object
    /// - `cache`: Local copy, overwritten on every successful download
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        cache: FileConfigSource,
    ) -> Self {
        Self {
            blobs,
            bucket: bucket.into(),
            key: key.into(),
            cache,
            policy: RetryPolicy::default(),
        }
    }

    /// Timeout and retry policy of the download
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl ConfigSource for RemoteConfigSource {
    async fn load(&self) -> Result<AppCatalog> {
        let fetched = self
            .policy
            .run(self.blobs.store_name(), "fetch", || {
                self.blobs.fetch(&self.bucket, &self.key)
            })
            .await;

        match fetched {
            Ok(bytes) => {
                // Only a valid document replaces the local copy
                let catalog = AppCatalog::from_slice(&bytes)?;
                write_atomically(self.cache.path(), &bytes).await?;
                tracing::info!(
                    "Downloaded catalog {}/{} to {}",
                    self.bucket,
                    self.key,
                    self.cache.path().display()
                );
                Ok(catalog)
            }
            Err(e) if self.cache.exists() => {
                tracing::warn!(
                    "Failed to download catalog {}/{}: {}. Using local copy {}",
                    self.bucket,
                    self.key,
                    e,
                    self.cache.path().display()
                );
                self.cache.load().await
            }
            Err(e) => Err(crate::Error::config_load(format!(
                "Failed to download catalog {}/{} and no local copy exists: {}",
                self.bucket, self.key, e
            ))),
        }
    }

    fn describe(&self) -> String {
        format!(
            "{} {}/{} (cached at {})",
            self.blobs.store_name(),
            self.bucket,
            self.key,
            self.cache.path().display()
        )
    }
}
