// # AWS Provider
//
// This crate implements the cloud provider seams of the IP list service on
// top of the AWS SDK for Rust:
//
// | Trait method            | AWS API                                   |
// |-------------------------|-------------------------------------------|
// | `list_hosted_zones`     | Route 53 `ListHostedZones`                |
// | `list_record_sets`      | Route 53 `ListResourceRecordSets`         |
// | `list_load_balancers`   | ELB (classic) `DescribeLoadBalancers`     |
// | `describe_instances`    | EC2 `DescribeInstances`                   |
// | `list_addresses`        | EC2 `DescribeAddresses`                   |
// | `describe_environments` | Elastic Beanstalk `DescribeEnvironments`  |
// | `BlobStore::fetch`      | S3 `GetObject`                            |
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (Cloud Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform AWS API calls
// - ✅ Translate SDK output into iplist-core types
// - ✅ Classify SDK errors as transient or fatal
//
// **Forbidden Capabilities**:
// - ❌ Retry or back off (SDK retries are disabled; the core `RetryPolicy` owns retries)
// - ❌ Follow pagination markers (the core pipeline drives them)
// - ❌ Spawn tasks or cache results
//
// ## Credentials
//
// Credentials and the default region come from the standard AWS provider
// chain (environment, profile, instance metadata). They never appear in logs.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_route53::config::http::HttpResponse;
use aws_sdk_route53::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_route53::types::RrType;
use iplist_core::registry::ProviderRegistry;
use iplist_core::traits::{
    BalancerPage, BlobStore, CloudProvider, CloudProviderFactory, DeploymentEnvironment,
    InstanceDescription, LoadBalancer, RecordSet, RecordType, Zone, ZonePage,
};
use iplist_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Provider name used in errors and logs
pub const PROVIDER_NAME: &str = "aws";

/// SDK-level bound of a single API call
///
/// The core applies its own, usually shorter, per-call timeout on top.
const DEFAULT_SDK_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes AWS uses for throttling and temporary server trouble
const TRANSIENT_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottled",
    "RequestThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "PriorRequestNotComplete",
    "SlowDown",
    "RequestTimeout",
    "RequestTimeoutException",
    "InternalError",
    "InternalFailure",
    "ServiceUnavailable",
    "Unavailable",
];

/// Region-scoped AWS provider
///
/// # Trust Level: Untrusted
///
/// Every method makes exactly one API call and reports its outcome.
#[derive(Clone)]
pub struct AwsProvider {
    region: String,
    route53: aws_sdk_route53::Client,
    ec2: aws_sdk_ec2::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    beanstalk: aws_sdk_elasticbeanstalk::Client,
}

impl AwsProvider {
    /// Build clients for `region` from a shared SDK configuration
    pub fn new(config: &SdkConfig, region: &str) -> Self {
        let route53 = aws_sdk_route53::config::Builder::from(config)
            .region(Region::new(region.to_string()))
            .build();
        let ec2 = aws_sdk_ec2::config::Builder::from(config)
            .region(Region::new(region.to_string()))
            .build();
        let elb = aws_sdk_elasticloadbalancing::config::Builder::from(config)
            .region(Region::new(region.to_string()))
            .build();
        let beanstalk = aws_sdk_elasticbeanstalk::config::Builder::from(config)
            .region(Region::new(region.to_string()))
            .build();

        Self {
            region: region.to_string(),
            route53: aws_sdk_route53::Client::from_conf(route53),
            ec2: aws_sdk_ec2::Client::from_conf(ec2),
            elb: aws_sdk_elasticloadbalancing::Client::from_conf(elb),
            beanstalk: aws_sdk_elasticbeanstalk::Client::from_conf(beanstalk),
        }
    }

    /// Region the clients are bound to
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl std::fmt::Debug for AwsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProvider")
            .field("region", &self.region)
            .finish()
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn list_hosted_zones(&self, marker: Option<&str>) -> Result<ZonePage> {
        let output = self
            .route53
            .list_hosted_zones()
            .set_marker(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| classify("ListHostedZones", e))?;

        let zones = output
            .hosted_zones()
            .iter()
            .map(|zone| Zone::new(zone.id(), zone.name()))
            .collect();
        let next_marker = if output.is_truncated() {
            output.next_marker().map(str::to_string)
        } else {
            None
        };

        tracing::debug!("ListHostedZones returned a page (truncated: {})", output.is_truncated());
        Ok(ZonePage { zones, next_marker })
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        start_type: RecordType,
        max_items: Option<i32>,
    ) -> Result<Vec<RecordSet>> {
        let output = self
            .route53
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(start_name)
            .start_record_type(rr_type(start_type))
            .set_max_items(max_items)
            .send()
            .await
            .map_err(|e| classify("ListResourceRecordSets", e))?;

        Ok(output
            .resource_record_sets()
            .iter()
            .map(|set| RecordSet {
                name: set.name().to_string(),
                record_type: set.r#type().as_str().to_string(),
                alias_target: set.alias_target().map(|alias| alias.dns_name().to_string()),
                values: set
                    .resource_records()
                    .iter()
                    .map(|record| record.value().to_string())
                    .collect(),
            })
            .collect())
    }

    async fn list_load_balancers(&self, marker: Option<&str>) -> Result<BalancerPage> {
        let output = self
            .elb
            .describe_load_balancers()
            .set_marker(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| classify("DescribeLoadBalancers", e))?;

        let balancers = output
            .load_balancer_descriptions()
            .iter()
            .filter_map(|lb| {
                let name = lb.load_balancer_name()?;
                Some(LoadBalancer {
                    name: name.to_string(),
                    instance_ids: lb
                        .instances()
                        .iter()
                        .filter_map(|instance| instance.instance_id().map(str::to_string))
                        .collect(),
                })
            })
            .collect();

        Ok(BalancerPage {
            balancers,
            next_marker: output.next_marker().map(str::to_string),
        })
    }

    async fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceDescription>> {
        let output = self
            .ec2
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| classify("DescribeInstances", e))?;

        Ok(output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .filter_map(|instance| {
                Some(InstanceDescription {
                    instance_id: instance.instance_id()?.to_string(),
                    public_ip: instance.public_ip_address().map(str::to_string),
                })
            })
            .collect())
    }

    async fn list_addresses(&self) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_addresses()
            .send()
            .await
            .map_err(|e| classify("DescribeAddresses", e))?;

        Ok(output
            .addresses()
            .iter()
            .filter_map(|address| address.public_ip().map(str::to_string))
            .collect())
    }

    async fn describe_environments(&self, application: &str) -> Result<Vec<DeploymentEnvironment>> {
        let output = self
            .beanstalk
            .describe_environments()
            .application_name(application)
            .send()
            .await
            .map_err(|e| classify("DescribeEnvironments", e))?;

        Ok(output
            .environments()
            .iter()
            .map(|env| DeploymentEnvironment {
                name: env.environment_name().unwrap_or_default().to_string(),
                endpoint_url: env.endpoint_url().map(str::to_string),
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// S3-backed blob store
#[derive(Clone)]
pub struct AwsBlobStore {
    s3: aws_sdk_s3::Client,
}

impl AwsBlobStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(config),
        }
    }
}

impl std::fmt::Debug for AwsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsBlobStore").finish()
    }
}

#[async_trait]
impl BlobStore for AwsBlobStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .s3
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("GetObject", e))?;

        // A body cut off mid-stream is worth another attempt
        let body = output.body.collect().await.map_err(|e| {
            Error::transient(PROVIDER_NAME, format!("GetObject {}/{}: {}", bucket, key, e))
        })?;

        let bytes = body.into_bytes().to_vec();
        tracing::debug!("Fetched s3://{}/{} ({} bytes)", bucket, key, bytes.len());
        Ok(bytes)
    }

    fn store_name(&self) -> &'static str {
        "s3"
    }
}

/// Factory for AWS providers
///
/// The SDK configuration (credential chain, default region) is loaded once,
/// on first use, and shared by every region's clients.
pub struct AwsFactory {
    sdk_timeout: Duration,
    config: OnceCell<SdkConfig>,
}

impl AwsFactory {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SDK_TIMEOUT)
    }

    /// Factory whose SDK clients give up after `sdk_timeout`
    pub fn with_timeout(sdk_timeout: Duration) -> Self {
        Self {
            sdk_timeout,
            config: OnceCell::new(),
        }
    }

    async fn sdk_config(&self) -> &SdkConfig {
        self.config
            .get_or_init(|| async {
                let config = aws_config::defaults(BehaviorVersion::latest())
                    .retry_config(RetryConfig::disabled())
                    .timeout_config(
                        TimeoutConfig::builder()
                            .operation_timeout(self.sdk_timeout)
                            .build(),
                    )
                    .load()
                    .await;
                tracing::info!(
                    "Loaded AWS configuration (default region: {})",
                    config
                        .region()
                        .map(|r| r.as_ref().to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
                config
            })
            .await
    }
}

impl Default for AwsFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudProviderFactory for AwsFactory {
    async fn for_region(&self, region: &str) -> Result<Arc<dyn CloudProvider>> {
        if region.trim().is_empty() {
            return Err(Error::config("AWS region cannot be empty"));
        }
        let config = self.sdk_config().await;
        Ok(Arc::new(AwsProvider::new(config, region)))
    }

    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>> {
        let config = self.sdk_config().await;
        Ok(Arc::new(AwsBlobStore::new(config)))
    }
}

/// Register the AWS provider with the registry
///
/// This should be called during daemon initialization.
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Arc::new(AwsFactory::new()));
}

fn rr_type(record_type: RecordType) -> RrType {
    match record_type {
        RecordType::A => RrType::A,
    }
}

/// Map an SDK error onto the core's transient/fatal split
fn classify<E>(operation: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{}: {}", operation, DisplayErrorContext(&err));
    let transient = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(_) => is_transient(
            err.code(),
            err.raw_response().map(|response| response.status().as_u16()),
        ),
        _ => false,
    };

    if transient {
        Error::transient(PROVIDER_NAME, message)
    } else {
        Error::fatal(PROVIDER_NAME, message)
    }
}

/// Whether a service error is worth retrying
///
/// Throttling codes and 429/5xx statuses are transient; everything else
/// (access denied, not found, validation) is terminal.
fn is_transient(code: Option<&str>, status: Option<u16>) -> bool {
    if code.is_some_and(|code| TRANSIENT_CODES.contains(&code)) {
        return true;
    }
    matches!(status, Some(429) | Some(500..=599))
}
