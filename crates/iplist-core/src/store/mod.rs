//! Config store
//!
//! [`ConfigStore`] owns the current app catalog. Requests take a snapshot
//! (`Arc<AppCatalog>`) and never observe a partially loaded catalog:
//! [`ConfigStore::reload`] loads a complete new catalog from its
//! [`ConfigSource`] and swaps the pointer. A failed reload keeps the
//! previous catalog.

pub mod file;
pub mod memory;
pub mod remote;

pub use file::{backup_path, write_atomically, FileConfigSource};
pub use memory::MemoryConfigSource;
pub use remote::RemoteConfigSource;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::AppCatalog;
use crate::error::Result;
use crate::traits::ConfigSource;

/// Holder of the current catalog snapshot
pub struct ConfigStore {
    source: Box<dyn ConfigSource>,
    current: RwLock<Arc<AppCatalog>>,
}

impl ConfigStore {
    /// Load the initial catalog from `source`
    ///
    /// # Returns
    ///
    /// - `Ok(ConfigStore)`: Store holding the loaded catalog
    /// - `Err(Error)`: If the initial load fails
    pub async fn load(source: Box<dyn ConfigSource>) -> Result<Self> {
        let catalog = source.load().await?;
        tracing::info!(
            "Loaded {} apps from {}",
            catalog.apps.len(),
            source.describe()
        );
        Ok(Self {
            source,
            current: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Store serving a fixed catalog
    pub fn from_catalog(catalog: AppCatalog) -> Self {
        Self {
            source: Box::new(MemoryConfigSource::new(catalog.clone())),
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Current catalog
    pub async fn snapshot(&self) -> Arc<AppCatalog> {
        self.current.read().await.clone()
    }

    /// Load a new catalog and swap it in
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of apps in the new catalog
    /// - `Err(Error)`: If loading fails; the previous catalog stays current
    pub async fn reload(&self) -> Result<usize> {
        let catalog = match self.source.load().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(
                    "Reload from {} failed, keeping previous catalog: {}",
                    self.source.describe(),
                    e
                );
                return Err(e);
            }
        };

        let apps = catalog.apps.len();
        *self.current.write().await = Arc::new(catalog);
        tracing::info!("Reloaded {} apps from {}", apps, self.source.describe());
        Ok(apps)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("source", &self.source.describe())
            .finish()
    }
}
