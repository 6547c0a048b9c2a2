// # Blob Store Trait
//
// Fetches named objects (configuration documents, static result files)
// from remote object storage.
//
// Implementations only perform the API call and return the bytes. Writing
// the local copy is owned by the core (`store::file::write_atomically`),
// so every local copy is replaced atomically regardless of provider.

use async_trait::async_trait;

/// Trait for remote object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full contents of `key` in `bucket`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: Object contents
    /// - `Err(Error)`: `ProviderFatal` for missing objects or denied access,
    ///   `ProviderTransient` for throttling and server errors
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
