// # Memory Config Source
//
// In-memory catalog, for tests and embedding. The catalog can be replaced
// to exercise reloads.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::AppCatalog;
use crate::error::Result;
use crate::traits::ConfigSource;

/// Catalog held in memory
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    catalog: RwLock<AppCatalog>,
}

impl MemoryConfigSource {
    pub fn new(catalog: AppCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    /// Replace the catalog returned by subsequent loads
    pub async fn replace(&self, catalog: AppCatalog) {
        *self.catalog.write().await = catalog;
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn load(&self) -> Result<AppCatalog> {
        let catalog = self.catalog.read().await.clone();
        catalog.validate()?;
        Ok(catalog)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
