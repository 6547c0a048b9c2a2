// # Config Source Trait
//
// Defines where the app catalog document comes from.
//
// ## Implementations
//
// - File-based: `store::FileConfigSource` (local JSON, atomic writes, backup recovery)
// - Remote: `store::RemoteConfigSource` (blob store → local cache → file)
// - In-memory: `store::MemoryConfigSource` (tests, embedding)
//
// ## Usage
//
// ```rust,ignore
// use iplist_core::ConfigSource;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let source = /* ConfigSource implementation */;
//     let catalog = source.load().await?;
//     println!("{} apps configured", catalog.apps.len());
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::catalog::AppCatalog;

/// Trait for app catalog sources
///
/// # Trust Level: Trusted (Core Component)
///
/// Sources may perform local file I/O and, through a `BlobStore`, remote
/// fetches. They must return a complete, validated catalog or an error:
/// the `ConfigStore` swaps whole catalogs and never patches one in place.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load and validate the full catalog
    ///
    /// # Returns
    ///
    /// - `Ok(AppCatalog)`: A validated catalog
    /// - `Err(Error)`: `ConfigLoad` when the document cannot be read,
    ///   `Config` when it is read but invalid
    async fn load(&self) -> Result<AppCatalog, crate::Error>;

    /// Human-readable description of the source (for logging)
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: ConfigSource + ?Sized> ConfigSource for std::sync::Arc<T> {
    async fn load(&self) -> Result<AppCatalog, crate::Error> {
        (**self).load().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
