//! Error types for the IP list service
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the IP list service
#[derive(Error, Debug)]
pub enum Error {
    /// No hosted zone owns the requested name (or its parent domain)
    #[error("Hosted zone not found: {0}")]
    ZoneNotFound(String),

    /// The zone exists but has no matching record set
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// The alias target does not look like a load balancer DNS name
    #[error("Malformed alias target: {0}")]
    MalformedAlias(String),

    /// No deployment environment serves the requested balancer
    #[error("No environment of application '{application}' serves balancer '{balancer}'")]
    EnvironmentNotFound {
        /// Deployment application name
        application: String,
        /// Balancer name fragment that was searched for
        balancer: String,
    },

    /// Retryable provider failure (throttling, 5xx, timeout, connection)
    #[error("Provider error ({provider}, transient): {message}")]
    ProviderTransient {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Terminal provider failure (auth, permission, not found, bad request)
    #[error("Provider error ({provider}): {message}")]
    ProviderFatal {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The app catalog could not be loaded
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    /// Invalid settings or catalog document
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hostname lookup failed
    #[error("Name resolution failed: {0}")]
    NameResolution(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a zone-not-found error
    pub fn zone_not_found(name: impl Into<String>) -> Self {
        Self::ZoneNotFound(name.into())
    }

    /// Create a record-not-found error
    pub fn record_not_found(name: impl Into<String>) -> Self {
        Self::RecordNotFound(name.into())
    }

    /// Create a malformed-alias error
    pub fn malformed_alias(target: impl Into<String>) -> Self {
        Self::MalformedAlias(target.into())
    }

    /// Create an environment-not-found error
    pub fn environment_not_found(
        application: impl Into<String>,
        balancer: impl Into<String>,
    ) -> Self {
        Self::EnvironmentNotFound {
            application: application.into(),
            balancer: balancer.into(),
        }
    }

    /// Create a retryable provider error
    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderTransient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a terminal provider error
    pub fn fatal(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderFatal {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration load error
    pub fn config_load(msg: impl Into<String>) -> Self {
        Self::ConfigLoad(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a name resolution error
    pub fn name_resolution(msg: impl Into<String>) -> Self {
        Self::NameResolution(msg.into())
    }

    /// Whether the retry policy may attempt the call again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderTransient { .. })
    }

    /// Stable snake_case tag used in JSON error output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ZoneNotFound(_) => "zone_not_found",
            Self::RecordNotFound(_) => "record_not_found",
            Self::MalformedAlias(_) => "malformed_alias",
            Self::EnvironmentNotFound { .. } => "environment_not_found",
            Self::ProviderTransient { .. } => "provider_transient",
            Self::ProviderFatal { .. } => "provider_fatal",
            Self::ConfigLoad(_) => "config_load",
            Self::Config(_) => "config",
            Self::NameResolution(_) => "name_resolution",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}
