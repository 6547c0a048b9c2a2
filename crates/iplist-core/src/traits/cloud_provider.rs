// # Cloud Provider Trait
//
// Defines the region-scoped interface to the cloud provider's DNS,
// compute, load-balancing and deployment APIs.
//
// ## Implementations
//
// - AWS: `iplist-provider-aws` crate (Route 53, EC2, classic ELB, Elastic Beanstalk)
//
// ## Usage
//
// ```rust,ignore
// use iplist_core::CloudProvider;
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let provider = /* CloudProvider implementation */;
//
//     // One page of hosted zones
//     let page = provider.list_hosted_zones(None).await?;
//     for zone in &page.zones {
//         println!("{} {}", zone.id, zone.name);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::sync::Arc;

use super::blob_store::BlobStore;

/// A hosted DNS zone as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Provider-assigned identifier (e.g. `/hostedzone/Z123ABC`)
    pub id: String,
    /// Fully-qualified root name, usually with a trailing dot
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One page of a hosted-zone listing
#[derive(Debug, Clone, Default)]
pub struct ZonePage {
    /// Zones on this page
    pub zones: Vec<Zone>,
    /// Continuation marker; `None` when the listing is exhausted
    pub next_marker: Option<String>,
}

/// DNS record type used when listing record sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// IPv4 address record
    A,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

/// A resource record set inside a hosted zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Record name, usually with a trailing dot
    pub name: String,
    /// Record type as reported by the provider
    pub record_type: String,
    /// Alias target DNS name, for alias records
    pub alias_target: Option<String>,
    /// Literal record values, for non-alias records
    pub values: Vec<String>,
}

/// A load balancer and the backend instances attached to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    /// Full balancer name
    pub name: String,
    /// Attached backend instance identifiers
    pub instance_ids: Vec<String>,
}

/// One page of a load balancer listing
#[derive(Debug, Clone, Default)]
pub struct BalancerPage {
    /// Balancers on this page
    pub balancers: Vec<LoadBalancer>,
    /// Continuation marker; `None` when the listing is exhausted
    pub next_marker: Option<String>,
}

/// A described compute instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescription {
    /// Instance identifier
    pub instance_id: String,
    /// Public IPv4 address, if the instance has one
    pub public_ip: Option<String>,
}

/// A deployment environment of a platform-as-a-service application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentEnvironment {
    /// Environment name
    pub name: String,
    /// Endpoint URL (balancer hostname or instance address), if assigned
    pub endpoint_url: Option<String>,
}

/// Trait for region-scoped cloud provider implementations
///
/// # Trust Level: Untrusted
///
/// Providers are isolated, stateless and single-shot:
///
/// ## Allowed Capabilities
/// - ✅ Perform API calls to the provider's endpoints
/// - ✅ Translate provider responses into the plain types above
/// - ✅ Classify failures as `ProviderTransient` or `ProviderFatal`
///
/// ## Forbidden Capabilities
/// - ❌ Retry, back off or sleep (owned by `RetryPolicy`)
/// - ❌ Follow pagination on their own (the pipeline drives markers)
/// - ❌ Spawn tasks or threads
/// - ❌ Cache results between calls
///
/// Every method performs exactly one API call so that the pipeline can
/// bound, retry and cancel each call individually.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// List one page of hosted DNS zones
    ///
    /// # Parameters
    ///
    /// - `marker`: Continuation marker returned by the previous page, or `None`
    async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage, crate::Error>;

    /// List record sets of a zone, starting at `start_name`/`start_type`
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Bare zone identifier (without `/hostedzone/`)
    /// - `start_name`: First record name to return (provider ordering)
    /// - `start_type`: First record type to return
    /// - `max_items`: Page size limit, provider default when `None`
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        start_type: RecordType,
        max_items: Option<i32>,
    ) -> Result<Vec<RecordSet>, crate::Error>;

    /// List one page of load balancers in the region
    async fn list_load_balancers(
        &self,
        marker: Option<&str>,
    ) -> Result<BalancerPage, crate::Error>;

    /// Describe the given instances
    ///
    /// Instances without a public IP are returned with `public_ip: None`.
    async fn describe_instances(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<InstanceDescription>, crate::Error>;

    /// List the public IPs of all static (elastic) addresses, in provider order
    async fn list_addresses(&self) -> Result<Vec<String>, crate::Error>;

    /// List the deployment environments of an application
    async fn describe_environments(
        &self,
        application: &str,
    ) -> Result<Vec<DeploymentEnvironment>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Factory that builds region-scoped providers and the blob store
#[async_trait]
pub trait CloudProviderFactory: Send + Sync {
    /// Create a provider bound to `region`
    async fn for_region(&self, region: &str) -> Result<Arc<dyn CloudProvider>, crate::Error>;

    /// Create the blob store used for remote documents
    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, crate::Error>;
}
