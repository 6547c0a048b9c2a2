// # iplist-core
//
// Core library of the IP list service: given an application name, report
// the public IP addresses currently serving it.
//
// ## Architecture Overview
//
// - **CloudProvider**: Trait for the region-scoped cloud APIs (zones, records,
//   balancers, instances, addresses, deployment environments)
// - **BlobStore**: Trait for remote object fetches
// - **NameResolver**: Trait for hostname → IPv4 resolution
// - **ConfigSource** / **ConfigStore**: Where the app catalog comes from, and
//   the atomically swapped snapshot every request reads
// - **ResolutionEngine**: Orchestrates the pipeline for one request
// - **ProviderRegistry**: Plugin-based registry for cloud providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider implementations
// 2. **Single-shot providers**: Providers make one call; timeouts and retries live in
//    `pipeline::retry`
// 3. **Partial failure**: One region's failure never hides another region's result
// 4. **Library-First**: The daemon is a thin HTTP layer over `ResolutionEngine`

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use catalog::{AppCatalog, AppConfig, RegionEntry, StandardEntry, StaticFileEntry, ZoneRecordLookup};
pub use config::{ConfigSourceConfig, EngineConfig, ServiceConfig};
pub use engine::{Facet, FacetError, RegionResult, Resolution, ResolutionEngine, ResolveRequest};
pub use error::{Error, Result};
pub use pipeline::RetryPolicy;
pub use registry::ProviderRegistry;
pub use store::{ConfigStore, FileConfigSource, MemoryConfigSource, RemoteConfigSource};
pub use traits::{BlobStore, CloudProvider, CloudProviderFactory, ConfigSource, NameResolver, SystemNameResolver};
