//! Per-request resolution output

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Error;

/// One category of IP data in a region result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// The region entry as a whole (provider construction)
    Region,
    /// Balancer name lookup through the hosted zone
    Dns,
    ElasticIps,
    BalancerIp,
    InstanceIps,
}

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Region => "region",
            Facet::Dns => "dns",
            Facet::ElasticIps => "elastic_ips",
            Facet::BalancerIp => "balancer_ip",
            Facet::InstanceIps => "instance_ips",
        }
    }
}

/// A failure recorded against one facet of a region entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetError {
    pub facet: Facet,
    /// Stable error tag, see [`Error::kind`]
    pub kind: &'static str,
    pub message: String,
}

impl FacetError {
    pub fn new(facet: Facet, error: &Error) -> Self {
        Self {
            facet,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Resolved IPs of one region
///
/// Named facet lists are only present in verbose output; `all_ips` holds
/// the deduplicated union of the facets flagged `true`, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic_ips: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancer_ip: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_ips: Option<Vec<String>>,

    pub all_ips: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FacetError>,
}

impl RegionResult {
    /// Result holding only an aggregate list
    pub fn with_all_ips(ips: Vec<String>) -> Self {
        let mut result = Self::default();
        result.add_to_all(ips);
        result
    }

    /// Merge the IPs of one facet
    ///
    /// # Parameters
    ///
    /// - `facet`: Facet the IPs belong to
    /// - `ips`: IPs in provider order
    /// - `include_in_all`: Whether the facet was flagged `true`
    /// - `verbose`: Whether to also record the facet under its own field
    pub fn merge(&mut self, facet: Facet, ips: Vec<String>, include_in_all: bool, verbose: bool) {
        if verbose {
            if let Some(slot) = self.facet_slot(facet) {
                slot.get_or_insert_with(Vec::new).extend(ips.iter().cloned());
            }
        }
        if include_in_all {
            self.add_to_all(ips);
        }
    }

    /// Record a failure of one facet
    pub fn record_error(&mut self, facet: Facet, error: &Error) {
        self.errors.push(FacetError::new(facet, error));
    }

    fn add_to_all(&mut self, ips: Vec<String>) {
        for ip in ips {
            if !self.all_ips.contains(&ip) {
                self.all_ips.push(ip);
            }
        }
    }

    fn facet_slot(&mut self, facet: Facet) -> Option<&mut Option<Vec<String>>> {
        match facet {
            Facet::ElasticIps => Some(&mut self.elastic_ips),
            Facet::BalancerIp => Some(&mut self.balancer_ip),
            Facet::InstanceIps => Some(&mut self.instance_ips),
            Facet::Region | Facet::Dns => None,
        }
    }
}

/// Outcome of resolving one app
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Per-key results (region name, or lookup name for zone records)
    Regions(BTreeMap<String, RegionResult>),
    /// A static document served verbatim
    Document(serde_json::Value),
    /// No catalog entry produced any result
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn only_flagged_facets_reach_all_ips() {
        let mut result = RegionResult::default();
        result.merge(Facet::ElasticIps, ips(&["1.1.1.1"]), true, false);
        result.merge(Facet::InstanceIps, ips(&["2.2.2.2"]), false, false);

        assert_eq!(result.all_ips, ips(&["1.1.1.1"]));
        assert!(result.elastic_ips.is_none());
        assert!(result.instance_ips.is_none());
    }

    #[test]
    fn verbose_fields_accumulate_and_all_ips_dedups() {
        let mut result = RegionResult::default();
        result.merge(Facet::ElasticIps, ips(&["1.1.1.1", "2.2.2.2"]), true, true);
        result.merge(Facet::ElasticIps, ips(&["2.2.2.2", "3.3.3.3"]), true, true);

        assert_eq!(
            result.elastic_ips,
            Some(ips(&["1.1.1.1", "2.2.2.2", "2.2.2.2", "3.3.3.3"]))
        );
        assert_eq!(result.all_ips, ips(&["1.1.1.1", "2.2.2.2", "3.3.3.3"]));
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let mut result = RegionResult::default();
        result.merge(Facet::BalancerIp, ips(&["9.9.9.9"]), false, true);
        result.record_error(Facet::InstanceIps, &Error::transient("mock", "Throttling"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["balancer_ip"][0], "9.9.9.9");
        assert_eq!(json["all_ips"].as_array().unwrap().len(), 0);
        assert!(json.get("elastic_ips").is_none());
        assert_eq!(json["errors"][0]["facet"], "instance_ips");
        assert_eq!(json["errors"][0]["kind"], "provider_transient");

        let empty = serde_json::to_value(RegionResult::default()).unwrap();
        assert!(empty.get("errors").is_none());
    }
}
