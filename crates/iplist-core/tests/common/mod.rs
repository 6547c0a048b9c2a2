//! Test doubles and common utilities for contract tests
//!
//! The doubles are scripted in-memory versions of the provider seams, with
//! call counters and failure injection so tests can verify how the
//! pipeline drives providers.

#![allow(dead_code)]

use async_trait::async_trait;
use iplist_core::error::{Error, Result};
use iplist_core::traits::{
    BalancerPage, BlobStore, CloudProvider, CloudProviderFactory, DeploymentEnvironment,
    InstanceDescription, LoadBalancer, NameResolver, RecordSet, RecordType, Zone, ZonePage,
};
use iplist_core::{AppCatalog, ConfigStore, EngineConfig, ResolutionEngine, RetryPolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Kind of error a scripted failure produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailKind {
    Transient,
    Fatal,
}

impl FailKind {
    fn error(self, operation: &str) -> Error {
        match self {
            FailKind::Transient => Error::transient("mock", format!("{}: Throttling", operation)),
            FailKind::Fatal => Error::fatal("mock", format!("{}: AccessDenied", operation)),
        }
    }
}

/// Scripted region of a cloud provider
#[derive(Default)]
pub struct MockCloud {
    zone_pages: Vec<Vec<Zone>>,
    records: HashMap<String, Vec<RecordSet>>,
    balancer_pages: Vec<Vec<LoadBalancer>>,
    instances: HashMap<String, Option<String>>,
    addresses: Vec<String>,
    environments: HashMap<String, Vec<DeploymentEnvironment>>,
    /// operation → (kind, remaining failures)
    failures: Mutex<HashMap<&'static str, (FailKind, usize)>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    describe_batches: Mutex<Vec<Vec<String>>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page of hosted zones
    pub fn with_zone_page(mut self, zones: &[(&str, &str)]) -> Self {
        self.zone_pages
            .push(zones.iter().map(|(id, name)| Zone::new(*id, *name)).collect());
        self
    }

    /// Add an alias A record to a zone (bare zone id)
    pub fn with_alias(mut self, zone_id: &str, name: &str, target: &str) -> Self {
        self.records.entry(zone_id.to_string()).or_default().push(RecordSet {
            name: name.to_string(),
            record_type: "A".to_string(),
            alias_target: Some(target.to_string()),
            values: Vec::new(),
        });
        self
    }

    /// Add a literal A record to a zone (bare zone id)
    pub fn with_a_record(mut self, zone_id: &str, name: &str, value: &str) -> Self {
        self.records.entry(zone_id.to_string()).or_default().push(RecordSet {
            name: name.to_string(),
            record_type: "A".to_string(),
            alias_target: None,
            values: vec![value.to_string()],
        });
        self
    }

    /// Add a page of load balancers
    pub fn with_balancer_page(mut self, balancers: &[(&str, &[&str])]) -> Self {
        self.balancer_pages.push(
            balancers
                .iter()
                .map(|(name, ids)| LoadBalancer {
                    name: name.to_string(),
                    instance_ids: ids.iter().map(|id| id.to_string()).collect(),
                })
                .collect(),
        );
        self
    }

    pub fn with_instance(mut self, id: &str, public_ip: Option<&str>) -> Self {
        self.instances
            .insert(id.to_string(), public_ip.map(str::to_string));
        self
    }

    pub fn with_addresses(mut self, addresses: &[&str]) -> Self {
        self.addresses = addresses.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_environment(mut self, application: &str, name: &str, endpoint: &str) -> Self {
        self.environments
            .entry(application.to_string())
            .or_default()
            .push(DeploymentEnvironment {
                name: name.to_string(),
                endpoint_url: Some(endpoint.to_string()),
            });
        self
    }

    /// Make `operation` fail `times` times (usize::MAX for always)
    pub fn failing(self, operation: &'static str, kind: FailKind, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(operation, (kind, times));
        self
    }

    /// Number of calls made to `operation`
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    /// Instance id batches passed to describe_instances, in call order
    pub fn describe_batches(&self) -> Vec<Vec<String>> {
        self.describe_batches.lock().unwrap().clone()
    }

    fn enter(&self, operation: &'static str) -> Result<()> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;

        let mut failures = self.failures.lock().unwrap();
        if let Some((kind, remaining)) = failures.get_mut(operation) {
            if *remaining > 0 {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                return Err(kind.error(operation));
            }
        }
        Ok(())
    }
}

fn page_index(marker: Option<&str>) -> usize {
    marker.and_then(|m| m.parse().ok()).unwrap_or(0)
}

fn next_marker(index: usize, pages: usize) -> Option<String> {
    (index + 1 < pages).then(|| (index + 1).to_string())
}

#[async_trait]
impl CloudProvider for MockCloud {
    async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage> {
        self.enter("list_hosted_zones")?;
        let index = page_index(marker);
        Ok(ZonePage {
            zones: self.zone_pages.get(index).cloned().unwrap_or_default(),
            next_marker: next_marker(index, self.zone_pages.len()),
        })
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        _start_type: RecordType,
        max_items: Option<i32>,
    ) -> Result<Vec<RecordSet>> {
        self.enter("list_record_sets")?;
        let records = self.records.get(zone_id).ok_or_else(|| {
            Error::fatal("mock", format!("NoSuchHostedZone: {}", zone_id))
        })?;

        // Records are listed from the first name at or after `start_name`
        let start = start_name.trim_end_matches('.').to_lowercase();
        let mut listed: Vec<RecordSet> = records
            .iter()
            .filter(|r| r.name.trim_end_matches('.').to_lowercase() >= start)
            .cloned()
            .collect();
        if let Some(max) = max_items {
            listed.truncate(max as usize);
        }
        Ok(listed)
    }

    async fn list_load_balancers(&self, marker: Option<&str>) -> Result<BalancerPage> {
        self.enter("list_load_balancers")?;
        let index = page_index(marker);
        Ok(BalancerPage {
            balancers: self.balancer_pages.get(index).cloned().unwrap_or_default(),
            next_marker: next_marker(index, self.balancer_pages.len()),
        })
    }

    async fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceDescription>> {
        self.enter("describe_instances")?;
        self.describe_batches
            .lock()
            .unwrap()
            .push(instance_ids.to_vec());
        Ok(instance_ids
            .iter()
            .filter_map(|id| {
                self.instances.get(id).map(|ip| InstanceDescription {
                    instance_id: id.clone(),
                    public_ip: ip.clone(),
                })
            })
            .collect())
    }

    async fn list_addresses(&self) -> Result<Vec<String>> {
        self.enter("list_addresses")?;
        Ok(self.addresses.clone())
    }

    async fn describe_environments(&self, application: &str) -> Result<Vec<DeploymentEnvironment>> {
        self.enter("describe_environments")?;
        Ok(self.environments.get(application).cloned().unwrap_or_default())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory serving scripted regions
#[derive(Default)]
pub struct MockFactory {
    regions: HashMap<String, Arc<MockCloud>>,
    blobs: Arc<MockBlobStore>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: &str, cloud: MockCloud) -> Self {
        self.regions.insert(region.to_string(), Arc::new(cloud));
        self
    }

    pub fn with_blobs(mut self, blobs: Arc<MockBlobStore>) -> Self {
        self.blobs = blobs;
        self
    }

    /// The scripted region, for inspecting call counts
    pub fn region(&self, region: &str) -> Arc<MockCloud> {
        self.regions[region].clone()
    }
}

#[async_trait]
impl CloudProviderFactory for MockFactory {
    async fn for_region(&self, region: &str) -> Result<Arc<dyn CloudProvider>> {
        self.regions
            .get(region)
            .cloned()
            .map(|cloud| cloud as Arc<dyn CloudProvider>)
            .ok_or_else(|| Error::fatal("mock", format!("unknown region {}", region)))
    }

    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>> {
        Ok(self.blobs.clone())
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct MockBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    unavailable: Mutex<bool>,
    transient_failures: AtomicUsize,
    fetch_count: AtomicUsize,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
    }

    /// Make every fetch fail with a transient error
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Fail the next `times` fetches with a transient error
    pub fn fail_next(&self, times: usize) {
        self.transient_failures.store(times, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if *self.unavailable.lock().unwrap() {
            return Err(Error::transient("mock-blob", "ServiceUnavailable"));
        }
        let scripted = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if scripted.is_ok() {
            return Err(Error::transient("mock-blob", "SlowDown"));
        }
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::fatal("mock-blob", format!("NoSuchKey: {}/{}", bucket, key)))
    }

    fn store_name(&self) -> &'static str {
        "mock-blob"
    }
}

/// Name resolver answering from a fixed table
#[derive(Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<String>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, ips: &[&str]) -> Self {
        self.hosts
            .insert(host.to_string(), ips.iter().map(|ip| ip.to_string()).collect());
        self
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<String>> {
        self.hosts
            .get(host)
            .cloned()
            .ok_or_else(|| Error::name_resolution(format!("{}: unknown host", host)))
    }
}

/// Engine settings with millisecond backoff
pub fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        max_retries: 2,
        retry_base_ms: 1,
        retry_max_ms: 2,
        call_timeout_secs: 1,
        ..EngineConfig::default()
    }
}

/// Parse a catalog document, panicking on invalid test input
pub fn catalog(json: &str) -> AppCatalog {
    AppCatalog::from_slice(json.as_bytes()).expect("valid test catalog")
}

/// Policy matching `fast_engine_config`
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy::from_config(&fast_engine_config())
}

/// Engine over a fixed catalog
pub fn engine(
    catalog_json: &str,
    factory: Arc<MockFactory>,
    resolver: StaticResolver,
    config: EngineConfig,
) -> ResolutionEngine {
    ResolutionEngine::new(
        Arc::new(ConfigStore::from_catalog(catalog(catalog_json))),
        factory,
        Arc::new(resolver),
        config,
    )
}

/// A region with one zone, one aliased app, one balancer and two instances
///
/// - `web.example.com` aliases `dualstack.awseb-web-123456789.<region>.elb.amazonaws.com.`
/// - balancer `awseb-web` holds `i-1` (`10.0.0.1`) and `i-2` (no public IP)
/// - elastic IPs `1.1.1.1` and `2.2.2.2`
/// - deployment app `web-prod` runs on `awseb-web-123456789.<region>.elb.amazonaws.com`
pub fn standard_region(region: &str, instance_ip: &str) -> MockCloud {
    let endpoint = format!("awseb-web-123456789.{}.elb.amazonaws.com", region);
    MockCloud::new()
        .with_zone_page(&[("/hostedzone/ZEXAMPLE", "example.com.")])
        .with_alias(
            "ZEXAMPLE",
            "web.example.com.",
            &format!("dualstack.{}.", endpoint),
        )
        .with_balancer_page(&[("awseb-web", &["i-1", "i-2"]), ("other-lb", &["i-9"])])
        .with_instance("i-1", Some(instance_ip))
        .with_instance("i-2", None)
        .with_instance("i-9", Some("10.9.9.9"))
        .with_addresses(&["1.1.1.1", "2.2.2.2"])
        .with_environment("web-prod", "web-green", &endpoint)
}
