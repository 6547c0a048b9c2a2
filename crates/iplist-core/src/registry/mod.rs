//! Plugin-based provider registry
//!
//! The registry allows cloud providers to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains in the daemon.
//!
//! ## Registration
//!
//! Provider crates register themselves during initialization:
//!
//! ```rust,ignore
//! # use iplist_core::registry::ProviderRegistry;
//! // In iplist-provider-aws
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_provider("aws", Arc::new(AwsFactory::new()));
//! }
//! ```
//!
//! The daemon then picks the factory named by its configuration:
//!
//! ```rust,ignore
//! let factory = registry.get_provider("aws")?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::traits::CloudProviderFactory;

/// Registry of cloud provider factories, by name
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn CloudProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cloud provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "aws")
    /// - `factory`: Factory for region-scoped providers and the blob store
    pub fn register_provider(&self, name: impl Into<String>, factory: Arc<dyn CloudProviderFactory>) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Look up a registered factory
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn CloudProviderFactory>)`: The registered factory
    /// - `Err(Error)`: If no provider of that name is registered
    pub fn get_provider(&self, name: &str) -> Result<Arc<dyn CloudProviderFactory>> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.get(name).cloned().ok_or_else(|| {
            Error::config(format!(
                "Unknown provider type: {} (registered: {:?})",
                name,
                providers.keys().collect::<Vec<_>>()
            ))
        })
    }

    /// List all registered provider types, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list_providers())
            .finish()
    }
}
