//! Elastic IP enumerator

use crate::error::Result;
use crate::pipeline::client::RegionClient;

/// All static IPs allocated in the region, minus `exclude`, in provider order
pub async fn list_elastic_ips(client: &RegionClient, exclude: &[String]) -> Result<Vec<String>> {
    let addresses = client.list_addresses().await?;
    Ok(addresses
        .into_iter()
        .filter(|ip| !exclude.contains(ip))
        .collect())
}
