//! Resolution engine
//!
//! The ResolutionEngine turns an app name into the public IPs serving it:
//! - Takes a snapshot of the app catalog from the ConfigStore
//! - Walks the matching app entries in catalog order
//! - Runs the pipeline stages each entry asks for
//! - Merges facet results per region
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────────┐
//!   ResolveRequest ────▶ │ ResolutionEngine │ ◀──── ConfigStore (snapshot)
//!                        └──────────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//! ┌───────────────┐      ┌─────────────────┐      ┌───────────────┐
//! │ static file   │      │ zone records    │      │ standard      │
//! │ (BlobStore)   │      │ (RegionClient)  │      │ (pipeline)    │
//! └───────────────┘      └─────────────────┘      └───────────────┘
//! ```
//!
//! ## Failure semantics
//!
//! A failing facet of a standard entry is recorded in that region's
//! `errors` and never aborts other facets or regions. Static-file and
//! zone-record entries are the whole response, so their failures are
//! returned as `Err`.

pub mod result;

pub use result::{Facet, FacetError, RegionResult, Resolution};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{RegionEntry, StandardEntry, StaticFileEntry, ZoneRecordLookup};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::pipeline::{self, RegionClient, RetryPolicy};
use crate::store::{write_atomically, ConfigStore};
use crate::traits::{CloudProviderFactory, NameResolver};

/// One resolution request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// App name, matched case-insensitively
    pub app: String,
    /// Only resolve standard entries of this region
    pub region: Option<String>,
    /// Also report facets flagged `false`, under their own fields
    pub verbose: bool,
}

impl ResolveRequest {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Core resolution engine
///
/// The engine holds no per-request state; concurrent calls to
/// [`ResolutionEngine::resolve`] share only the read-only catalog snapshot.
/// Dropping the returned future abandons every in-flight provider call.
pub struct ResolutionEngine {
    /// Current app catalog
    store: Arc<ConfigStore>,

    /// Builds region-scoped providers and the blob store
    factory: Arc<dyn CloudProviderFactory>,

    /// Resolves deployment endpoints to IPv4 addresses
    resolver: Arc<dyn NameResolver>,

    /// Timeout and retry policy of every provider call
    policy: RetryPolicy,

    /// Engine settings
    config: EngineConfig,
}

impl ResolutionEngine {
    /// Create a new resolution engine
    ///
    /// # Parameters
    ///
    /// - `store`: Catalog holder
    /// - `factory`: Provider factory
    /// - `resolver`: Name resolver for deployment endpoints
    /// - `config`: Engine settings (retry policy, default region, cache dir)
    pub fn new(
        store: Arc<ConfigStore>,
        factory: Arc<dyn CloudProviderFactory>,
        resolver: Arc<dyn NameResolver>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            factory,
            resolver,
            policy: RetryPolicy::from_config(&config),
            config,
        }
    }

    /// Catalog holder used by this engine
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Resolve the IPs of one app
    ///
    /// # Returns
    ///
    /// - `Ok(Resolution::Regions)`: Per-region results (possibly with facet errors)
    /// - `Ok(Resolution::Document)`: A static document, served verbatim
    /// - `Ok(Resolution::NoMatch)`: No entry matched the app and region filter
    /// - `Err(Error)`: A static-file or zone-record entry failed
    pub async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution> {
        let catalog = self.store.snapshot().await;
        let mut regions: BTreeMap<String, RegionResult> = BTreeMap::new();

        for app in catalog.matching(&request.app) {
            debug!("Resolving {} ({} entries)", app.name, app.config.len());

            for entry in &app.config {
                match entry {
                    RegionEntry::StaticFile(file) => {
                        let document = self.fetch_static_file(file).await?;
                        info!("Serving static document {} for {}", file.remote_path, app.name);
                        return Ok(Resolution::Document(document));
                    }
                    RegionEntry::ZoneRecords(lookups) => {
                        let results = self.lookup_zone_records(lookups).await?;
                        info!("Serving {} zone record lookups for {}", results.len(), app.name);
                        return Ok(Resolution::Regions(results));
                    }
                    RegionEntry::Standard(standard) => {
                        if let Some(wanted) = &request.region {
                            if &standard.region != wanted {
                                continue;
                            }
                        }
                        let result = regions.entry(standard.region.clone()).or_default();
                        self.resolve_standard(standard, request.verbose, result).await;
                    }
                }
            }
        }

        if regions.is_empty() {
            debug!("No entries matched {}", request.app);
            return Ok(Resolution::NoMatch);
        }

        let failures: usize = regions.values().map(|r| r.errors.len()).sum();
        if failures > 0 {
            warn!(
                "Resolved {} with {} facet failures across {} regions",
                request.app,
                failures,
                regions.len()
            );
        } else {
            info!("Resolved {} in {} regions", request.app, regions.len());
        }
        Ok(Resolution::Regions(regions))
    }

    /// Resolve one standard entry into `result`
    ///
    /// Facet failures are recorded in `result`; nothing is returned.
    async fn resolve_standard(&self, entry: &StandardEntry, verbose: bool, result: &mut RegionResult) {
        let client = match self.client(&entry.region).await {
            Ok(client) => client,
            Err(e) => {
                warn!("No provider for region {}: {}", entry.region, e);
                result.record_error(Facet::Region, &e);
                return;
            }
        };

        let want_elastic = wanted(entry.show_elastic_ip, verbose);
        let want_balancer = wanted(entry.show_balancer_ip, verbose);
        let want_instance = wanted(entry.show_instance_ip, verbose);

        if want_elastic {
            match pipeline::list_elastic_ips(&client, &entry.exclusions).await {
                Ok(ips) => result.merge(
                    Facet::ElasticIps,
                    ips,
                    entry.show_elastic_ip == Some(true),
                    verbose,
                ),
                Err(e) => record_failure(result, Facet::ElasticIps, entry, e),
            }
        }

        if !want_balancer && !want_instance {
            return;
        }

        let balancer_name = match pipeline::resolve_balancer_name(&client, &entry.dns_name).await {
            Ok(name) => name,
            Err(e) => {
                record_failure(result, Facet::Dns, entry, e);
                return;
            }
        };

        if want_balancer {
            match self.balancer_ips(&client, entry, &balancer_name).await {
                Ok(ips) => result.merge(
                    Facet::BalancerIp,
                    ips,
                    entry.show_balancer_ip == Some(true),
                    verbose,
                ),
                Err(e) => record_failure(result, Facet::BalancerIp, entry, e),
            }
        }

        if want_instance {
            match instance_ips(&client, &balancer_name).await {
                Ok(ips) => result.merge(
                    Facet::InstanceIps,
                    ips,
                    entry.show_instance_ip == Some(true),
                    verbose,
                ),
                Err(e) => record_failure(result, Facet::InstanceIps, entry, e),
            }
        }
    }

    /// Current IPs of the balancer fronting the deployment application
    async fn balancer_ips(
        &self,
        client: &RegionClient,
        entry: &StandardEntry,
        balancer_name: &str,
    ) -> Result<Vec<String>> {
        let application = entry.deployment_app.as_deref().ok_or_else(|| {
            Error::config(format!("{} has no deployment application", entry.dns_name))
        })?;
        let endpoint = pipeline::active_endpoint(client, application, balancer_name).await?;
        debug!("Active endpoint of {} is {}", application, endpoint);
        self.policy
            .run("resolver", "resolve_ipv4", || {
                self.resolver.resolve_ipv4(&endpoint)
            })
            .await
    }

    /// Fetch a static document and keep a local copy
    async fn fetch_static_file(&self, entry: &StaticFileEntry) -> Result<serde_json::Value> {
        let bucket = entry
            .bucket
            .as_deref()
            .or(self.config.default_bucket.as_deref())
            .ok_or_else(|| {
                Error::config(format!(
                    "No bucket configured for static file {}",
                    entry.remote_path
                ))
            })?;

        let blobs = self.factory.blob_store().await?;
        let bytes = self
            .policy
            .run(blobs.store_name(), "fetch", || blobs.fetch(bucket, &entry.remote_path))
            .await?;

        let local = self.local_copy_path(entry);
        write_atomically(&local, &bytes).await?;
        debug!("Stored {}/{} at {}", bucket, entry.remote_path, local.display());

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn local_copy_path(&self, entry: &StaticFileEntry) -> PathBuf {
        match &entry.local_path {
            Some(path) => PathBuf::from(path),
            None => {
                let name = Path::new(&entry.remote_path)
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("static.json"));
                Path::new(&self.config.cache_dir).join(name)
            }
        }
    }

    /// Literal A record values per lookup, keyed by lookup name
    async fn lookup_zone_records(
        &self,
        lookups: &[ZoneRecordLookup],
    ) -> Result<BTreeMap<String, RegionResult>> {
        let client = self.client(&self.config.default_region).await?;
        let mut results = BTreeMap::new();
        for lookup in lookups {
            let ips = pipeline::records_with_prefix(
                &client,
                &lookup.hosted_zone_id,
                &lookup.pattern,
                &lookup.domain,
            )
            .await?;
            results.insert(lookup.name.clone(), RegionResult::with_all_ips(ips));
        }
        Ok(results)
    }

    async fn client(&self, region: &str) -> Result<RegionClient> {
        let provider = self.factory.for_region(region).await?;
        Ok(RegionClient::new(region, provider, self.policy))
    }
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish()
    }
}

/// Public IPs of the instances behind every balancer matching `balancer_name`
async fn instance_ips(client: &RegionClient, balancer_name: &str) -> Result<Vec<String>> {
    let balancers = pipeline::find_balancers(client, balancer_name).await?;
    pipeline::balancer_instance_ips(client, &balancers).await
}

/// A facet is fetched when flagged `true`, or flagged at all in verbose mode
fn wanted(flag: Option<bool>, verbose: bool) -> bool {
    match flag {
        Some(true) => true,
        Some(false) => verbose,
        None => false,
    }
}

fn record_failure(result: &mut RegionResult, facet: Facet, entry: &StandardEntry, error: Error) {
    warn!(
        "{} of {} in {} failed: {}",
        facet.as_str(),
        entry.dns_name,
        entry.region,
        error
    );
    result.record_error(facet, &error);
}
