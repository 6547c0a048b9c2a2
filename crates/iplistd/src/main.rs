// # iplistd - IP list daemon
//
// HTTP service reporting the public IP addresses that serve each configured
// application. Resolution lives in iplist-core; this binary only wires it up:
//
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers and loading the app catalog
// 4. Serving HTTP until SIGTERM/SIGINT, reloading the catalog on SIGHUP
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### App catalog
// - `IPLIST_CONFIG_BUCKET`: Bucket holding the catalog document
// - `IPLIST_CONFIG_PATH`: Object key of the catalog document
// - `IPLIST_CONFIG_LOCAL_PATH`: Local catalog file, also the cache of the
//   remote document (default: iplist_config/config.json)
//
// When both bucket and key are set the catalog is downloaded at startup and
// on every reload. Otherwise the local file is used as is.
//
// ### HTTP
// - `IPLIST_LISTEN_ADDR`: Listen address (default: 0.0.0.0:5000)
// - `IPLIST_NO_HTTPS` (or `NOHTTPS`): Disable the HTTP to HTTPS redirect
// - `IPLIST_STATIC_DIR`: Directory holding favicon.ico (default: static)
//
// ### Provider
// - `IPLIST_PROVIDER`: Cloud provider type (aws)
// - `IPLIST_DEFAULT_REGION`: Region for global APIs (default: us-east-1)
// - `IPLIST_CACHE_DIR`: Directory for static documents (default: iplist_config)
//
// ### Engine
// - `IPLIST_MAX_RETRIES`: Retries of a transient provider failure (0-10)
// - `IPLIST_RETRY_BASE_MS`: First backoff delay
// - `IPLIST_RETRY_MAX_MS`: Backoff cap
// - `IPLIST_CALL_TIMEOUT_SECS`: Timeout of one provider call (1-300)
//
// ### Logging
// - `IPLIST_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export IPLIST_CONFIG_BUCKET=my-config-bucket
// export IPLIST_CONFIG_PATH=iplist/config.json
// export IPLIST_LISTEN_ADDR=127.0.0.1:8080
// export IPLIST_NO_HTTPS=1
//
// iplistd
// ```

mod http;

use anyhow::{Context, Result};
use iplist_core::{
    ConfigSource, ConfigSourceConfig, ConfigStore, EngineConfig, FileConfigSource,
    ProviderRegistry, RemoteConfigSource, ResolutionEngine, RetryPolicy, ServiceConfig,
    SystemNameResolver,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IplistExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<IplistExitCode> for ExitCode {
    fn from(code: IplistExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    config_bucket: Option<String>,
    config_path: Option<String>,
    config_local_path: String,
    listen_addr: String,
    https_redirect: bool,
    static_dir: String,
    provider_type: String,
    default_region: String,
    cache_dir: String,
    max_retries: Option<usize>,
    retry_base_ms: Option<u64>,
    retry_max_ms: Option<u64>,
    call_timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let no_https = var("IPLIST_NO_HTTPS").or_else(|| var("NOHTTPS"));

        Ok(Self {
            config_bucket: var("IPLIST_CONFIG_BUCKET"),
            config_path: var("IPLIST_CONFIG_PATH"),
            config_local_path: var("IPLIST_CONFIG_LOCAL_PATH")
                .unwrap_or_else(|| "iplist_config/config.json".to_string()),
            listen_addr: var("IPLIST_LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            https_redirect: !no_https.is_some_and(|v| is_truthy(&v)),
            static_dir: var("IPLIST_STATIC_DIR").unwrap_or_else(|| "static".to_string()),
            provider_type: var("IPLIST_PROVIDER").unwrap_or_else(|| "aws".to_string()),
            default_region: var("IPLIST_DEFAULT_REGION")
                .unwrap_or_else(|| "us-east-1".to_string()),
            cache_dir: var("IPLIST_CACHE_DIR").unwrap_or_else(|| "iplist_config".to_string()),
            max_retries: parse_var(&var, "IPLIST_MAX_RETRIES")?,
            retry_base_ms: parse_var(&var, "IPLIST_RETRY_BASE_MS")?,
            retry_max_ms: parse_var(&var, "IPLIST_RETRY_MAX_MS")?,
            call_timeout_secs: parse_var(&var, "IPLIST_CALL_TIMEOUT_SECS")?,
            log_level: var("IPLIST_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks the daemon-only settings here; catalog source and engine
    /// settings are validated by iplist-core.
    fn validate(&self) -> Result<()> {
        if self.config_bucket.is_some() != self.config_path.is_some() {
            anyhow::bail!(
                "IPLIST_CONFIG_BUCKET and IPLIST_CONFIG_PATH must be set together. \
                Unset both to use the local catalog at {}",
                self.config_local_path
            );
        }

        if SocketAddr::from_str(&self.listen_addr).is_err() {
            anyhow::bail!(
                "IPLIST_LISTEN_ADDR must be an address like 0.0.0.0:5000. Got: {}",
                self.listen_addr
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPLIST_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.service_config()
            .validate()
            .context("Invalid service configuration")?;

        Ok(())
    }

    /// Settings handed to iplist-core
    fn service_config(&self) -> ServiceConfig {
        let catalog = match (&self.config_bucket, &self.config_path) {
            (Some(bucket), Some(key)) => ConfigSourceConfig::Remote {
                bucket: bucket.clone(),
                key: key.clone(),
                cache_path: self.config_local_path.clone(),
            },
            _ => ConfigSourceConfig::File {
                path: self.config_local_path.clone(),
            },
        };

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_base_ms: self.retry_base_ms.unwrap_or(defaults.retry_base_ms),
            retry_max_ms: self.retry_max_ms.unwrap_or(defaults.retry_max_ms),
            call_timeout_secs: self.call_timeout_secs.unwrap_or(defaults.call_timeout_secs),
            default_region: self.default_region.clone(),
            default_bucket: self.config_bucket.clone(),
            cache_dir: self.cache_dir.clone(),
        };

        ServiceConfig { catalog, engine }
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional numeric variable; a present but malformed value is an error
fn parse_var<T: FromStr>(var: impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{} is not a valid number ({}): {}", name, raw, e))
        })
        .transpose()
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IplistExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return IplistExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IplistExitCode::ConfigError.into();
    }

    info!("Starting iplistd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IplistExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => IplistExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup error: {:#}", e);
                IplistExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {:#}", e);
                IplistExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Daemon failure, split by the exit code it maps to
enum DaemonError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: Config) -> std::result::Result<(), DaemonError> {
    let (engine, listener) = start(&config).await.map_err(DaemonError::Startup)?;

    let shutdown = shutdown_signal().await.map_err(DaemonError::Startup)?;
    let reloader = spawn_reloader(Arc::clone(engine.store())).map_err(DaemonError::Startup)?;

    let state = http::AppState {
        engine,
        https_redirect: config.https_redirect,
    };
    let app = http::router(state, &PathBuf::from(&config.static_dir));

    info!("Listening on {}", config.listen_addr);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let signal = shutdown.await;
            info!("Received shutdown signal: {}", signal);
        })
        .await;

    if let Some(reloader) = reloader {
        reloader.abort();
    }

    served
        .context("HTTP server failed")
        .map_err(DaemonError::Runtime)?;

    info!("Shut down cleanly");
    Ok(())
}

/// Build the engine and bind the listener
async fn start(config: &Config) -> Result<(Arc<ResolutionEngine>, tokio::net::TcpListener)> {
    let service = config.service_config();

    let registry = ProviderRegistry::new();

    #[cfg(feature = "aws")]
    {
        info!("Registering AWS provider");
        iplist_provider_aws::register(&registry);
    }

    let factory = registry
        .get_provider(&config.provider_type)
        .context("Unknown IPLIST_PROVIDER")?;

    let source: Box<dyn ConfigSource> = match &service.catalog {
        ConfigSourceConfig::File { path } => Box::new(FileConfigSource::new(path)),
        ConfigSourceConfig::Remote {
            bucket,
            key,
            cache_path,
        } => {
            let blobs = factory
                .blob_store()
                .await
                .context("Failed to create blob store")?;
            Box::new(
                RemoteConfigSource::new(
                    blobs,
                    bucket.clone(),
                    key.clone(),
                    FileConfigSource::new(cache_path),
                )
                .with_retry_policy(RetryPolicy::from_config(&service.engine)),
            )
        }
    };
    info!("Catalog source: {}", source.describe());

    let store = ConfigStore::load(source)
        .await
        .context("Failed to load app catalog")?;

    let engine = ResolutionEngine::new(
        Arc::new(store),
        factory,
        Arc::new(SystemNameResolver),
        service.engine,
    );

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    Ok((Arc::new(engine), listener))
}

/// Reload the catalog on every SIGHUP
///
/// # Returns
///
/// The reload task, or `None` on platforms without SIGHUP.
#[cfg(unix)]
fn spawn_reloader(store: Arc<ConfigStore>) -> Result<Option<tokio::task::JoinHandle<()>>> {
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    Ok(Some(tokio::spawn(async move {
        while sighup.recv().await.is_some() {
            info!("Received SIGHUP, reloading catalog");
            match store.reload().await {
                Ok(apps) => info!("Catalog reloaded: {} apps", apps),
                Err(e) => warn!("Keeping previous catalog: {}", e),
            }
        }
    })))
}

#[cfg(not(unix))]
fn spawn_reloader(_store: Arc<ConfigStore>) -> Result<Option<tokio::task::JoinHandle<()>>> {
    Ok(None)
}

/// Install the shutdown signal handlers (SIGTERM, SIGINT)
///
/// # Returns
///
/// A future resolving to the name of the signal received.
#[cfg(unix)]
async fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Install the shutdown signal handler (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn shutdown_signal() -> Result<impl std::future::Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_use_local_catalog_with_https_redirect() {
        let config = config(&[]).unwrap();
        config.validate().unwrap();

        assert!(config.https_redirect);
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        match config.service_config().catalog {
            ConfigSourceConfig::File { path } => assert_eq!(path, "iplist_config/config.json"),
            other => panic!("expected file source, got {:?}", other),
        }
    }

    #[test]
    fn bucket_and_key_select_remote_catalog() {
        let config = config(&[
            ("IPLIST_CONFIG_BUCKET", "cfg-bucket"),
            ("IPLIST_CONFIG_PATH", "iplist/config.json"),
        ])
        .unwrap();
        config.validate().unwrap();

        let service = config.service_config();
        assert_eq!(service.catalog.type_name(), "remote");
        assert_eq!(service.engine.default_bucket.as_deref(), Some("cfg-bucket"));
    }

    #[test]
    fn bucket_without_key_is_rejected() {
        let config = config(&[("IPLIST_CONFIG_BUCKET", "cfg-bucket")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn legacy_nohttps_disables_redirect() {
        assert!(!config(&[("NOHTTPS", "1")]).unwrap().https_redirect);
        assert!(!config(&[("IPLIST_NO_HTTPS", "true")]).unwrap().https_redirect);
        assert!(config(&[("IPLIST_NO_HTTPS", "0")]).unwrap().https_redirect);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = config(&[("IPLIST_MAX_RETRIES", "three")]).unwrap_err();
        assert!(err.to_string().contains("IPLIST_MAX_RETRIES"));
    }

    #[test]
    fn engine_ranges_are_checked() {
        let retries = config(&[("IPLIST_MAX_RETRIES", "11")]).unwrap();
        assert!(retries.validate().is_err());

        let timeout = config(&[("IPLIST_CALL_TIMEOUT_SECS", "0")]).unwrap();
        assert!(timeout.validate().is_err());
    }

    #[test]
    fn invalid_listen_addr_and_log_level_are_rejected() {
        assert!(config(&[("IPLIST_LISTEN_ADDR", "localhost")]).unwrap().validate().is_err());
        assert!(config(&[("IPLIST_LOG_LEVEL", "loud")]).unwrap().validate().is_err());
    }
}
