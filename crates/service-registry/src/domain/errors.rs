//! Domain errors for service discovery.

use shared_bus::BusError;
use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The node failed validation (empty name, address, node id, or zero TTL).
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// No advertiser answered the query before the deadline.
    #[error("service {name}:{version} not found")]
    NotFound { name: String, version: String },

    /// The caller's context was cancelled before a result was available.
    #[error("operation cancelled")]
    Cancelled,

    /// The bus could not be reached or the connection was lost.
    #[error("registry backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A bounded operation (such as connecting) ran out of time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The registry must be started first.
    #[error("registry not started")]
    NotStarted,

    /// A wire message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No backend is registered under this name.
    #[error("unknown registry backend: {0}")]
    UnknownBackend(String),
}

impl RegistryError {
    /// Convenience constructor for `NotFound`.
    pub fn not_found(name: &str, version: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::BackendUnavailable(_) | Self::Timeout(_)
        )
    }

    /// Label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidNode(_) => "invalid_node",
            Self::NotFound { .. } => "not_found",
            Self::Cancelled => "cancelled",
            Self::BackendUnavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::NotStarted => "not_started",
            Self::Codec(_) => "codec",
            Self::InvalidConfig(_) => "invalid_config",
            Self::UnknownBackend(_) => "unknown_backend",
        }
    }
}

impl From<BusError> for RegistryError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::NotConnected | BusError::Unavailable(_) => {
                Self::BackendUnavailable(err.to_string())
            }
            BusError::InvalidSubject(_) | BusError::InvalidAddress(_) => {
                Self::InvalidConfig(err.to_string())
            }
        }
    }
}
