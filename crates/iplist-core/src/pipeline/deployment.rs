//! Deployment endpoint resolver
//!
//! Finds the deployment environment currently fronted by a balancer. The
//! returned endpoint is resolved to addresses by a `NameResolver`.

use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::client::RegionClient;

/// Endpoint of the first environment of `application` whose endpoint URL
/// contains `balancer_name` (case-insensitive)
///
/// # Errors
///
/// - `EnvironmentNotFound`: no environment matches
pub async fn active_endpoint(
    client: &RegionClient,
    application: &str,
    balancer_name: &str,
) -> Result<String> {
    let needle = balancer_name.to_lowercase();
    let environments = client.describe_environments(application).await?;
    debug!(
        "Application {} has {} environments in {}",
        application,
        environments.len(),
        client.region()
    );

    environments
        .into_iter()
        .find_map(|env| {
            env.endpoint_url
                .filter(|url| url.to_lowercase().contains(&needle))
        })
        .ok_or_else(|| Error::environment_not_found(application, balancer_name))
}
