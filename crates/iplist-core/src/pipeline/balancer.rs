//! Balancer locator
//!
//! Finds every load balancer in a region whose full name contains a name
//! fragment (case-insensitive), together with its backend instances.

use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::client::RegionClient;
use crate::traits::LoadBalancer;

/// Find balancers whose name contains `name_fragment`
///
/// Every match is returned, in listing order; the listing follows
/// continuation markers until exhausted.
pub async fn find_balancers(
    client: &RegionClient,
    name_fragment: &str,
) -> Result<Vec<LoadBalancer>> {
    let needle = name_fragment.to_lowercase();
    let mut matches = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let page = client.list_load_balancers(marker.as_deref()).await?;
        matches.extend(
            page.balancers
                .into_iter()
                .filter(|lb| lb.name.to_lowercase().contains(&needle)),
        );

        match page.next_marker {
            Some(next) if marker.as_deref() == Some(next.as_str()) => {
                return Err(Error::fatal(
                    client.provider_name(),
                    format!("load balancer listing repeated marker {}", next),
                ));
            }
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    debug!(
        "{} balancers in {} match '{}'",
        matches.len(),
        client.region(),
        name_fragment
    );
    Ok(matches)
}
