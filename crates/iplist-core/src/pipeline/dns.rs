//! DNS resolver
//!
//! Maps an application's public DNS name to the name stem of the load
//! balancer behind it:
//!
//! 1. List every hosted zone, following continuation markers to the end.
//! 2. Pick the zone owning the name: an exact match wins, otherwise the
//!    first zone equal to the parent domain.
//! 3. Read the name's A record and take its alias target.
//! 4. Strip the provider artifacts from the alias target (`dualstack.`
//!    prefix, `-<9 digits>` random suffix and everything after it).
//!
//! Also hosts the zone-record lookup used by zone-records catalog entries.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::client::RegionClient;
use crate::traits::{RecordType, Zone};

/// Prefix of provider-assigned hosted zone identifiers
const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// `dualstack.<name>-<9 digits>`; greedy so the last numeric suffix is stripped
static DUALSTACK_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dualstack\.(.*)-[0-9]{9}").expect("valid alias pattern"));

/// `<name>-<9 digits>`; lazy so the first numeric suffix is stripped
static PLAIN_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*?)-[0-9]{9}").expect("valid alias pattern"));

/// Resolve the balancer name stem behind `fqdn`
///
/// # Errors
///
/// - `ZoneNotFound`: no hosted zone owns `fqdn` or its parent domain
/// - `RecordNotFound`: the zone has no A record for `fqdn`
/// - `MalformedAlias`: the record is not an alias, or its target has no
///   recognizable balancer suffix
pub async fn resolve_balancer_name(client: &RegionClient, fqdn: &str) -> Result<String> {
    let fqdn = normalize(fqdn);
    let zones = list_all_zones(client).await?;
    debug!("Looking up zone for {} among {} zones", fqdn, zones.len());

    let zone = select_zone(&zones, fqdn).ok_or_else(|| Error::zone_not_found(fqdn))?;
    let zone_id = parse_zone_id(&zone.id, client.provider_name())?;
    debug!("Using zone {} ({}) for {}", zone_id, zone.name, fqdn);

    let record = client
        .list_record_sets(&zone_id, fqdn, RecordType::A, Some(1))
        .await?
        .into_iter()
        .next()
        .filter(|record| normalize(&record.name).eq_ignore_ascii_case(fqdn))
        .ok_or_else(|| Error::record_not_found(format!("A {} in zone {}", fqdn, zone_id)))?;

    let alias = record.alias_target.ok_or_else(|| {
        Error::malformed_alias(format!("{} is not an alias record", record.name))
    })?;

    let name = parse_balancer_name(&alias)?;
    debug!("Alias {} -> balancer {}", alias, name);
    Ok(name)
}

/// List every hosted zone, following continuation markers until exhausted
pub async fn list_all_zones(client: &RegionClient) -> Result<Vec<Zone>> {
    let mut zones = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let page = client.list_hosted_zones(marker.as_deref()).await?;
        zones.extend(page.zones);

        match page.next_marker {
            Some(next) if marker.as_deref() == Some(next.as_str()) => {
                return Err(Error::fatal(
                    client.provider_name(),
                    format!("hosted zone listing repeated marker {}", next),
                ));
            }
            Some(next) => marker = Some(next),
            None => return Ok(zones),
        }
    }
}

/// Choose the zone owning `fqdn`
///
/// An exact match wins wherever it appears in the listing. Otherwise the
/// first zone equal to the parent domain (leftmost label stripped) is used.
pub fn select_zone<'a>(zones: &'a [Zone], fqdn: &str) -> Option<&'a Zone> {
    let fqdn = normalize(fqdn);
    let parent = fqdn.split_once('.').map(|(_, rest)| rest).unwrap_or(fqdn);

    let mut parent_match = None;
    for zone in zones {
        let name = normalize(&zone.name);
        if name.eq_ignore_ascii_case(fqdn) {
            return Some(zone);
        }
        if parent_match.is_none() && name.eq_ignore_ascii_case(parent) {
            parent_match = Some(zone);
        }
    }
    parent_match
}

/// Extract the bare zone id from a provider identifier
///
/// Accepts `/hostedzone/<ID>` and bare `<ID>`; anything else is rejected.
pub fn parse_zone_id(raw: &str, provider: &str) -> Result<String> {
    let id = raw.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(raw);
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(Error::fatal(
            provider,
            format!("unexpected hosted zone id format: {}", raw),
        ));
    }
    Ok(id.to_string())
}

/// Extract the balancer name stem from an alias target DNS name
pub fn parse_balancer_name(alias: &str) -> Result<String> {
    let pattern = if alias.contains("dualstack") {
        &*DUALSTACK_ALIAS
    } else {
        &*PLAIN_ALIAS
    };

    pattern
        .captures(alias)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::malformed_alias(alias))
}

/// Literal A record values of `zone_id` whose names carry `prefix`
///
/// Lists the record sets starting at `prefix.domain` and keeps those whose
/// name contains the first label of `prefix`, emitting each record's first
/// value. Alias records carry no literal value and are skipped.
pub async fn records_with_prefix(
    client: &RegionClient,
    zone_id: &str,
    prefix: &str,
    domain: &str,
) -> Result<Vec<String>> {
    let zone_id = parse_zone_id(zone_id, client.provider_name())?;
    let start = format!("{}.{}", prefix, domain);
    let label = prefix.split('.').next().unwrap_or(prefix);

    let records = client
        .list_record_sets(&zone_id, &start, RecordType::A, None)
        .await?;

    let values: Vec<String> = records
        .into_iter()
        .filter(|record| record.name.contains(label))
        .filter_map(|record| record.values.into_iter().next())
        .collect();

    debug!("Zone {} has {} records for {}", zone_id, values.len(), start);
    Ok(values)
}

fn normalize(name: &str) -> &str {
    name.trim_end_matches('.')
}
