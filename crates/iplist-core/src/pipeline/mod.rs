//! Resolution pipeline
//!
//! The provider lookups that turn an app entry into IP addresses:
//!
//! ```text
//! dns name ──▶ hosted zone ──▶ alias record ──▶ balancer name
//!                                                   │
//!                    ┌──────────────────────────────┼───────────────────────┐
//!                    ▼                              ▼                       ▼
//!             deployment env               balancers + instances      elastic IPs
//!             endpoint ──▶ IPs             ──▶ public IPs             (minus exclusions)
//! ```
//!
//! Each stage takes a [`RegionClient`], which applies the [`RetryPolicy`]
//! to every provider call.

pub mod balancer;
pub mod client;
pub mod deployment;
pub mod dns;
pub mod elastic;
pub mod instance;
pub mod retry;

pub use balancer::find_balancers;
pub use client::RegionClient;
pub use deployment::active_endpoint;
pub use dns::{records_with_prefix, resolve_balancer_name};
pub use elastic::list_elastic_ips;
pub use instance::{balancer_instance_ips, public_ips};
pub use retry::RetryPolicy;
