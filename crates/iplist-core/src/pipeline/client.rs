//! Region-scoped provider handle
//!
//! [`RegionClient`] pairs a `CloudProvider` with the `RetryPolicy`, so that
//! every pipeline stage gets timeouts and retries without handling them.

use std::sync::Arc;

use crate::error::Result;
use crate::pipeline::retry::RetryPolicy;
use crate::traits::{
    BalancerPage, CloudProvider, DeploymentEnvironment, InstanceDescription, RecordSet,
    RecordType, ZonePage,
};

/// A provider bound to one region, with every call run under the retry policy
#[derive(Clone)]
pub struct RegionClient {
    region: String,
    provider: Arc<dyn CloudProvider>,
    policy: RetryPolicy,
}

impl RegionClient {
    pub fn new(
        region: impl Into<String>,
        provider: Arc<dyn CloudProvider>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            region: region.into(),
            provider,
            policy,
        }
    }

    /// Region this client is bound to
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage> {
        self.policy
            .run(self.provider_name(), "list_hosted_zones", || {
                self.provider.list_hosted_zones(marker)
            })
            .await
    }

    pub async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        start_type: RecordType,
        max_items: Option<i32>,
    ) -> Result<Vec<RecordSet>> {
        self.policy
            .run(self.provider_name(), "list_record_sets", || {
                self.provider
                    .list_record_sets(zone_id, start_name, start_type, max_items)
            })
            .await
    }

    pub async fn list_load_balancers(&self, marker: Option<&str>) -> Result<BalancerPage> {
        self.policy
            .run(self.provider_name(), "list_load_balancers", || {
                self.provider.list_load_balancers(marker)
            })
            .await
    }

    pub async fn describe_instances(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<InstanceDescription>> {
        self.policy
            .run(self.provider_name(), "describe_instances", || {
                self.provider.describe_instances(instance_ids)
            })
            .await
    }

    pub async fn list_addresses(&self) -> Result<Vec<String>> {
        self.policy
            .run(self.provider_name(), "list_addresses", || {
                self.provider.list_addresses()
            })
            .await
    }

    pub async fn describe_environments(
        &self,
        application: &str,
    ) -> Result<Vec<DeploymentEnvironment>> {
        self.policy
            .run(self.provider_name(), "describe_environments", || {
                self.provider.describe_environments(application)
            })
            .await
    }
}

impl std::fmt::Debug for RegionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionClient")
            .field("region", &self.region)
            .field("provider", &self.provider.provider_name())
            .field("policy", &self.policy)
            .finish()
    }
}
