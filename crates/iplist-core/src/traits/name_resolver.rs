// # Name Resolver Trait
//
// Hostname → IPv4 addresses, used to turn a deployment endpoint
// (a balancer hostname) into the addresses it currently answers on.

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for hostname resolution
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `host` to its IPv4 addresses, in resolver order, without duplicates
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<String>, crate::Error>;
}

/// Resolver backed by the system resolver (via tokio's `lookup_host`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNameResolver;

#[async_trait]
impl NameResolver for SystemNameResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<String>, crate::Error> {
        let host = strip_endpoint(host);
        if host.is_empty() {
            return Err(crate::Error::name_resolution("empty hostname"));
        }

        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| crate::Error::name_resolution(format!("{}: {}", host, e)))?;

        let mut ips: Vec<String> = Vec::new();
        for addr in addrs {
            if let IpAddr::V4(v4) = addr.ip() {
                let ip = v4.to_string();
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }
        }

        if ips.is_empty() {
            return Err(crate::Error::name_resolution(format!(
                "{}: no IPv4 addresses",
                host
            )));
        }

        tracing::debug!("Resolved {} -> {:?}", host, ips);
        Ok(ips)
    }
}

/// Reduce an endpoint URL to its bare hostname
///
/// Deployment endpoints are usually bare hostnames but may carry a scheme,
/// a path or a trailing dot.
fn strip_endpoint(endpoint: &str) -> &str {
    let rest = endpoint
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(endpoint);
    let host = rest.split(['/', ':']).next().unwrap_or(rest);
    host.trim_end_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_endpoint_keeps_bare_hosts() {
        assert_eq!(
            strip_endpoint("awseb-e-1-AWSEBLoa-ABC-123456789.us-east-1.elb.amazonaws.com"),
            "awseb-e-1-AWSEBLoa-ABC-123456789.us-east-1.elb.amazonaws.com"
        );
    }

    #[test]
    fn strip_endpoint_drops_scheme_port_and_path() {
        assert_eq!(strip_endpoint("http://lb.example.com:80/health"), "lb.example.com");
        assert_eq!(strip_endpoint("lb.example.com."), "lb.example.com");
    }

    #[tokio::test]
    async fn literal_addresses_resolve_to_themselves() {
        let ips = SystemNameResolver.resolve_ipv4("127.0.0.1").await.unwrap();
        assert_eq!(ips, vec!["127.0.0.1".to_string()]);
    }
}
