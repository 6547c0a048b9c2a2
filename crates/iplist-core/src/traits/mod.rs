//! Core traits for the IP list service
//!
//! This module defines the abstract interfaces to everything outside the
//! resolution pipeline.
//!
//! - [`CloudProvider`]: Region-scoped DNS, compute, balancer and deployment APIs
//! - [`BlobStore`]: Remote object storage
//! - [`NameResolver`]: Hostname → IPv4 resolution
//! - [`ConfigSource`]: Where the app catalog comes from

pub mod blob_store;
pub mod cloud_provider;
pub mod config_source;
pub mod name_resolver;

pub use blob_store::BlobStore;
pub use cloud_provider::{
    BalancerPage, CloudProvider, CloudProviderFactory, DeploymentEnvironment,
    InstanceDescription, LoadBalancer, RecordSet, RecordType, Zone, ZonePage,
};
pub use config_source::ConfigSource;
pub use name_resolver::{NameResolver, SystemNameResolver};
