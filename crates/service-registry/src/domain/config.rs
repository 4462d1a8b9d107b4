//! Registry configuration with validation.
//!
//! Loaded from TOML or assembled with [`RegistryConfig::builder`]. Durations
//! are written as `"500ms"`, `"5s"` or `"2m"`.

use crate::domain::errors::RegistryError;
use crate::domain::node::MAX_TTL;
use serde::{Deserialize, Serialize};
use shared_bus::{ConnectOptions, TlsSettings};
use std::path::Path;
use std::time::Duration;

/// Message-bus backend name.
pub const BACKEND_BUS: &str = "bus";
/// In-process loopback backend name.
pub const BACKEND_LOCAL: &str = "local";

pub const DEFAULT_DOMAIN: &str = "orb";
pub const DEFAULT_ADDRESS: &str = "nats://localhost:4222";
pub const DEFAULT_QUORUM: usize = 1;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SWEEP_CEILING: Duration = Duration::from_secs(1);

/// Upper bound for query, connection and sweep durations.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Lower bound for the watcher's expiry sweep.
pub const SWEEP_FLOOR: Duration = Duration::from_millis(10);

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Backend selected through the factory
    pub backend: String,
    /// Namespace for topics
    pub domain: String,
    /// Bus server addresses
    pub addresses: Vec<String>,
    /// Require TLS to the bus
    pub secure: bool,
    /// TLS material when `secure` is set
    pub tls: Option<TlsSettings>,
    /// Distinct replies after which a query returns early
    pub quorum: usize,
    /// Override for `<domain>.registry.query`
    pub query_topic: Option<String>,
    /// Override for `<domain>.registry.watch`
    pub watch_topic: Option<String>,
    /// Query deadline
    #[serde(with = "duration_str")]
    pub timeout: Duration,
    /// Upper bound on connecting to the bus at start
    #[serde(with = "duration_str")]
    pub connection_timeout: Duration,
    /// Re-advertisement period; defaults to half the smallest local TTL
    #[serde(with = "opt_duration_str")]
    pub refresh_interval: Option<Duration>,
    /// Longest pause between watcher expiry sweeps
    #[serde(with = "duration_str")]
    pub sweep_ceiling: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: BACKEND_BUS.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            addresses: vec![DEFAULT_ADDRESS.to_string()],
            secure: false,
            tls: None,
            quorum: DEFAULT_QUORUM,
            query_topic: None,
            watch_topic: None,
            timeout: DEFAULT_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            refresh_interval: None,
            sweep_ceiling: DEFAULT_SWEEP_CEILING,
        }
    }
}

impl RegistryConfig {
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, RegistryError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| RegistryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::InvalidConfig(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.backend.trim().is_empty() {
            return Err(RegistryError::InvalidConfig("backend cannot be empty".into()));
        }
        if self.domain.trim().is_empty() {
            return Err(RegistryError::InvalidConfig("domain cannot be empty".into()));
        }
        if self.addresses.is_empty() {
            return Err(RegistryError::InvalidConfig(
                "at least one bus address is required".into(),
            ));
        }
        if self.quorum == 0 {
            return Err(RegistryError::InvalidConfig("quorum must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(RegistryError::InvalidConfig("timeout cannot be 0".into()));
        }
        if self.connection_timeout.is_zero() {
            return Err(RegistryError::InvalidConfig(
                "connection_timeout cannot be 0".into(),
            ));
        }
        for (field, value) in [
            ("timeout", self.timeout),
            ("connection_timeout", self.connection_timeout),
            ("sweep_ceiling", self.sweep_ceiling),
        ] {
            if value > MAX_TIMEOUT {
                return Err(RegistryError::InvalidConfig(format!(
                    "{field} must be at most {MAX_TIMEOUT:?}"
                )));
            }
        }
        match self.refresh_interval {
            Some(d) if d.is_zero() => {
                return Err(RegistryError::InvalidConfig(
                    "refresh_interval cannot be 0".into(),
                ))
            }
            Some(d) if d > MAX_TTL => {
                return Err(RegistryError::InvalidConfig(format!(
                    "refresh_interval must be at most {MAX_TTL:?}"
                )))
            }
            _ => {}
        }
        if self.sweep_ceiling < SWEEP_FLOOR {
            return Err(RegistryError::InvalidConfig(format!(
                "sweep_ceiling must be at least {SWEEP_FLOOR:?}"
            )));
        }
        if self.secure && self.tls.is_none() {
            return Err(RegistryError::InvalidConfig(
                "secure connections require tls settings".into(),
            ));
        }
        for topic in [&self.query_topic, &self.watch_topic].into_iter().flatten() {
            shared_bus::validate_subject(topic)?;
        }
        Ok(())
    }

    /// Topic queries are published on.
    pub fn query_topic(&self) -> String {
        self.query_topic
            .clone()
            .unwrap_or_else(|| format!("{}.registry.query", self.domain))
    }

    /// Topic advertisements are published on.
    pub fn watch_topic(&self) -> String {
        self.watch_topic
            .clone()
            .unwrap_or_else(|| format!("{}.registry.watch", self.domain))
    }

    /// Options for opening the bus connection.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            addresses: self.addresses.clone(),
            tls: if self.secure { self.tls.clone() } else { None },
            connect_timeout: self.connection_timeout,
        }
    }
}

/// Builder for [`RegistryConfig`]; `build` validates.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfigBuilder {
    config: RegistryConfig,
}

impl RegistryConfigBuilder {
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.config.backend = backend.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = domain.into();
        self
    }

    pub fn addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn secure(mut self, tls: TlsSettings) -> Self {
        self.config.secure = true;
        self.config.tls = Some(tls);
        self
    }

    pub fn quorum(mut self, quorum: usize) -> Self {
        self.config.quorum = quorum;
        self
    }

    pub fn query_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.query_topic = Some(topic.into());
        self
    }

    pub fn watch_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.watch_topic = Some(topic.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.config.refresh_interval = Some(interval);
        self
    }

    pub fn sweep_ceiling(mut self, ceiling: Duration) -> Self {
        self.config.sweep_ceiling = ceiling;
        self
    }

    pub fn build(self) -> Result<RegistryConfig, RegistryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Human-readable durations ("250ms", "5s", "2m", bare seconds).
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn format(duration: &Duration) -> String {
        if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    pub fn parse(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

mod opt_duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&super::duration_str::format(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::duration_str::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
