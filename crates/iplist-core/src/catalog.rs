//! App catalog document
//!
//! The catalog describes, per application, which regions to resolve and how.
//! It is an externally supplied JSON document:
//!
//! ```json
//! {
//!   "apps": [
//!     {
//!       "name": "billing",
//!       "config": [
//!         {
//!           "dnsname": "billing.example.com",
//!           "beanstalk_app_name": "billing-prod",
//!           "region": "us-east-1",
//!           "exclusions": ["203.0.113.9"],
//!           "show_eip": true,
//!           "show_lb_ip": false,
//!           "show_inst_ip": true
//!         }
//!       ]
//!     },
//!     { "name": "partners", "config": [ { "s3filepath": "static/partners.json" } ] },
//!     {
//!       "name": "mail",
//!       "config": [
//!         { "R53": [ { "Name": "mx", "HostedZoneId": "Z123", "Pattern": "mx", "Domain": "example.com" } ] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Each entry is exactly one of three modes (standard, static file, zone
//! records). Mixed or empty entries are rejected when the document is parsed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// The full catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppCatalog {
    /// Configured applications
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

impl AppCatalog {
    /// Parse and validate a catalog from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let catalog: AppCatalog = serde_json::from_slice(bytes)
            .map_err(|e| Error::config(format!("Invalid catalog document: {}", e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate the catalog
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for app in &self.apps {
            if app.name.trim().is_empty() {
                return Err(Error::config("App name cannot be empty"));
            }
            if !seen.insert(app.name.to_lowercase()) {
                return Err(Error::config(format!("Duplicate app name: {}", app.name)));
            }
        }
        Ok(())
    }

    /// Names of all configured apps, in document order
    pub fn app_names(&self) -> Vec<&str> {
        self.apps.iter().map(|app| app.name.as_str()).collect()
    }

    /// Apps whose name matches `name` case-insensitively
    pub fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AppConfig> + 'a {
        self.apps
            .iter()
            .filter(move |app| app.name.eq_ignore_ascii_case(name))
    }
}

/// One application and its ordered region entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, unique within the catalog (case-insensitive)
    pub name: String,

    /// Region entries, resolved in order
    #[serde(default)]
    pub config: Vec<RegionEntry>,
}

/// A region entry in one of its three mutually exclusive modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegionEntry", into = "RawRegionEntry")]
pub enum RegionEntry {
    /// Resolve balancer, instance and elastic IPs live
    Standard(StandardEntry),
    /// Serve a document fetched from the blob store verbatim
    StaticFile(StaticFileEntry),
    /// Read literal A records from hosted zones
    ZoneRecords(Vec<ZoneRecordLookup>),
}

/// Standard (live resolution) entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardEntry {
    /// Public DNS name of the application (alias to its balancer)
    pub dns_name: String,
    /// Deployment (Elastic Beanstalk) application name
    pub deployment_app: Option<String>,
    /// Cloud region identifier
    pub region: String,
    /// Elastic IPs never to report
    pub exclusions: Vec<String>,
    /// Elastic IP facet: absent = skip, false = verbose only, true = report
    pub show_elastic_ip: Option<bool>,
    /// Balancer IP facet
    pub show_balancer_ip: Option<bool>,
    /// Instance IP facet
    pub show_instance_ip: Option<bool>,
}

impl StandardEntry {
    pub fn new(dns_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            dns_name: dns_name.into(),
            deployment_app: None,
            region: region.into(),
            exclusions: Vec::new(),
            show_elastic_ip: None,
            show_balancer_ip: None,
            show_instance_ip: None,
        }
    }

    pub fn with_deployment_app(mut self, app: impl Into<String>) -> Self {
        self.deployment_app = Some(app.into());
        self
    }

    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_elastic_ip(mut self, show: bool) -> Self {
        self.show_elastic_ip = Some(show);
        self
    }

    pub fn with_balancer_ip(mut self, show: bool) -> Self {
        self.show_balancer_ip = Some(show);
        self
    }

    pub fn with_instance_ip(mut self, show: bool) -> Self {
        self.show_instance_ip = Some(show);
        self
    }
}

/// Static file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFileEntry {
    /// Object key in the blob store
    pub remote_path: String,
    /// Local copy path; the service cache directory when `None`
    pub local_path: Option<String>,
    /// Bucket; the service config bucket when `None`
    pub bucket: Option<String>,
}

/// One zone-record lookup of a zone-records entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecordLookup {
    /// Key of this lookup in the response
    #[serde(rename = "Name")]
    pub name: String,
    /// Hosted zone to read
    #[serde(rename = "HostedZoneId")]
    pub hosted_zone_id: String,
    /// Record name prefix
    #[serde(rename = "Pattern")]
    pub pattern: String,
    /// Domain appended to the prefix
    #[serde(rename = "Domain")]
    pub domain: String,
}

/// Wire form of a region entry, before mode validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRegionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    dnsname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    beanstalk_app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusions: Option<Vec<String>>,
    #[serde(alias = "show_eip", skip_serializing_if = "Option::is_none")]
    show_elastic_ip: Option<bool>,
    #[serde(alias = "show_lb_ip", skip_serializing_if = "Option::is_none")]
    show_balancer_ip: Option<bool>,
    #[serde(alias = "show_inst_ip", skip_serializing_if = "Option::is_none")]
    show_instance_ip: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    s3filepath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    localpath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(rename = "R53", skip_serializing_if = "Option::is_none")]
    r53: Option<Vec<ZoneRecordLookup>>,
}

impl TryFrom<RawRegionEntry> for RegionEntry {
    type Error = String;

    fn try_from(raw: RawRegionEntry) -> std::result::Result<Self, Self::Error> {
        let is_static = raw.s3filepath.is_some();
        let is_zone = raw.r53.is_some();
        let is_standard =
            raw.dnsname.is_some() || raw.region.is_some() || raw.beanstalk_app_name.is_some();

        match (is_standard, is_static, is_zone) {
            (true, false, false) => {
                let dns_name = non_empty(raw.dnsname, "dnsname")?;
                let region = non_empty(raw.region, "region")?;
                if raw.show_balancer_ip.is_some() && raw.beanstalk_app_name.is_none() {
                    return Err(format!(
                        "entry for {} requests the balancer IP but has no beanstalk_app_name",
                        dns_name
                    ));
                }
                Ok(RegionEntry::Standard(StandardEntry {
                    dns_name,
                    deployment_app: raw.beanstalk_app_name,
                    region,
                    exclusions: raw.exclusions.unwrap_or_default(),
                    show_elastic_ip: raw.show_elastic_ip,
                    show_balancer_ip: raw.show_balancer_ip,
                    show_instance_ip: raw.show_instance_ip,
                }))
            }
            (false, true, false) => Ok(RegionEntry::StaticFile(StaticFileEntry {
                remote_path: non_empty(raw.s3filepath, "s3filepath")?,
                local_path: raw.localpath,
                bucket: raw.bucket,
            })),
            (false, false, true) => {
                let lookups = raw.r53.unwrap_or_default();
                if lookups.is_empty() {
                    return Err("R53 entry must list at least one lookup".to_string());
                }
                Ok(RegionEntry::ZoneRecords(lookups))
            }
            (false, false, false) => Err(
                "entry must specify dnsname/region, s3filepath or R53".to_string(),
            ),
            _ => Err(
                "entry mixes modes: dnsname/region, s3filepath and R53 are mutually exclusive"
                    .to_string(),
            ),
        }
    }
}

impl From<RegionEntry> for RawRegionEntry {
    fn from(entry: RegionEntry) -> Self {
        match entry {
            RegionEntry::Standard(e) => RawRegionEntry {
                dnsname: Some(e.dns_name),
                beanstalk_app_name: e.deployment_app,
                region: Some(e.region),
                exclusions: Some(e.exclusions),
                show_elastic_ip: e.show_elastic_ip,
                show_balancer_ip: e.show_balancer_ip,
                show_instance_ip: e.show_instance_ip,
                ..Default::default()
            },
            RegionEntry::StaticFile(e) => RawRegionEntry {
                s3filepath: Some(e.remote_path),
                localpath: e.local_path,
                bucket: e.bucket,
                ..Default::default()
            },
            RegionEntry::ZoneRecords(lookups) => RawRegionEntry {
                r53: Some(lookups),
                ..Default::default()
            },
        }
    }
}

fn non_empty(value: Option<String>, field: &str) -> std::result::Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("{} is required and cannot be empty", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<AppCatalog> {
        AppCatalog::from_slice(json.as_bytes())
    }

    #[test]
    fn standard_entry_accepts_short_flag_names() {
        let catalog = parse(
            r#"{"apps":[{"name":"web","config":[{
                "dnsname":"web.example.com","beanstalk_app_name":"web-prod",
                "region":"us-east-1","exclusions":["1.2.3.4"],
                "show_eip":true,"show_lb_ip":false
            }]}]}"#,
        )
        .unwrap();

        match &catalog.apps[0].config[0] {
            RegionEntry::Standard(e) => {
                assert_eq!(e.dns_name, "web.example.com");
                assert_eq!(e.deployment_app.as_deref(), Some("web-prod"));
                assert_eq!(e.exclusions, vec!["1.2.3.4".to_string()]);
                assert_eq!(e.show_elastic_ip, Some(true));
                assert_eq!(e.show_balancer_ip, Some(false));
                assert_eq!(e.show_instance_ip, None);
            }
            other => panic!("expected standard entry, got {:?}", other),
        }
    }

    #[test]
    fn static_and_zone_entries_parse() {
        let catalog = parse(
            r#"{"apps":[
                {"name":"a","config":[{"s3filepath":"lists/a.json","localpath":"/tmp/a.json"}]},
                {"name":"b","config":[{"R53":[{"Name":"mx","HostedZoneId":"Z1","Pattern":"mx","Domain":"example.com"}]}]}
            ]}"#,
        )
        .unwrap();

        assert!(matches!(catalog.apps[0].config[0], RegionEntry::StaticFile(_)));
        match &catalog.apps[1].config[0] {
            RegionEntry::ZoneRecords(lookups) => assert_eq!(lookups[0].hosted_zone_id, "Z1"),
            other => panic!("expected zone records entry, got {:?}", other),
        }
    }

    #[test]
    fn mixed_modes_are_rejected() {
        let err = parse(
            r#"{"apps":[{"name":"a","config":[{"dnsname":"a.example.com","region":"us-east-1","s3filepath":"x"}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"), "{}", err);
    }

    #[test]
    fn balancer_facet_requires_deployment_app() {
        let err = parse(
            r#"{"apps":[{"name":"a","config":[{"dnsname":"a.example.com","region":"us-east-1","show_lb_ip":true}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("beanstalk_app_name"), "{}", err);
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let err = parse(r#"{"apps":[{"name":"Web","config":[]},{"name":"web","config":[]}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let catalog = parse(r#"{"apps":[{"name":"Billing","config":[]}]}"#).unwrap();
        assert_eq!(catalog.matching("billing").count(), 1);
        assert_eq!(catalog.matching("other").count(), 0);
        assert_eq!(catalog.app_names(), vec!["Billing"]);
    }

    #[test]
    fn entries_survive_serialization() {
        let entry = RegionEntry::Standard(
            StandardEntry::new("web.example.com", "eu-west-1").with_instance_ip(true),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["dnsname"], "web.example.com");
        assert_eq!(json["show_instance_ip"], true);
        let back: RegionEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
