//! Instance resolver
//!
//! Public IPs of backend instances. Instances without a public IP are
//! skipped; only API-level failures are errors.

use tracing::debug;

use crate::error::Result;
use crate::pipeline::client::RegionClient;
use crate::traits::LoadBalancer;

/// Public IPs of the given instances, in provider order
pub async fn public_ips(client: &RegionClient, instance_ids: &[String]) -> Result<Vec<String>> {
    if instance_ids.is_empty() {
        return Ok(Vec::new());
    }

    let instances = client.describe_instances(instance_ids).await?;
    let ips: Vec<String> = instances
        .into_iter()
        .filter_map(|instance| {
            if instance.public_ip.is_none() {
                debug!("Instance {} has no public IP", instance.instance_id);
            }
            instance.public_ip
        })
        .collect();

    Ok(ips)
}

/// Public IPs of the instances behind each balancer, one describe call per balancer
pub async fn balancer_instance_ips(
    client: &RegionClient,
    balancers: &[LoadBalancer],
) -> Result<Vec<String>> {
    let mut ips = Vec::new();
    for balancer in balancers {
        debug!(
            "Describing {} instances behind {}",
            balancer.instance_ids.len(),
            balancer.name
        );
        ips.extend(public_ips(client, &balancer.instance_ids).await?);
    }
    Ok(ips)
}
