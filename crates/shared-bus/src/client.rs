//! # Bus Client
//!
//! The connection-level interface the registry talks to. Implementations own
//! the connection; a single client is shared by every task of one registry.

use crate::error::BusError;
use crate::subject::SubjectFilter;
use crate::subscriber::Subscription;
use crate::INBOX_PREFIX;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// TLS material for secure bus connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    /// CA bundle used to verify the server.
    pub ca_file: Option<PathBuf>,
    /// Client certificate.
    pub cert_file: Option<PathBuf>,
    /// Client private key.
    pub key_file: Option<PathBuf>,
    /// Server name override for verification.
    pub server_name: Option<String>,
}

impl TlsSettings {
    /// A client certificate needs its key and vice versa.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidAddress` describing the missing half of the pair.
    pub fn validate(&self) -> Result<(), BusError> {
        match (&self.cert_file, &self.key_file) {
            (Some(_), None) => Err(BusError::InvalidAddress(
                "tls cert_file set without key_file".into(),
            )),
            (None, Some(_)) => Err(BusError::InvalidAddress(
                "tls key_file set without cert_file".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Options used when opening a bus connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Candidate server addresses (`scheme://host[:port]`).
    pub addresses: Vec<String>,
    /// TLS settings when the connection must be secure.
    pub tls: Option<TlsSettings>,
    /// Upper bound on establishing the connection.
    pub connect_timeout: Duration,
}

impl ConnectOptions {
    /// Check every address and the TLS settings.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidAddress` for an empty list or a malformed entry.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.addresses.is_empty() {
            return Err(BusError::InvalidAddress("no bus addresses configured".into()));
        }
        for address in &self.addresses {
            parse_address(address)?;
        }
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        Ok(())
    }
}

/// A parsed `scheme://host[:port]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusAddress {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

/// Parse a bus address.
///
/// # Errors
///
/// `BusError::InvalidAddress` if the scheme or host is missing, or the port
/// is not a valid `u16`.
pub fn parse_address(address: &str) -> Result<BusAddress, BusError> {
    let invalid = |why: &str| BusError::InvalidAddress(format!("'{address}': {why}"));

    let (scheme, rest) = address
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;
    if scheme.is_empty() {
        return Err(invalid("missing scheme"));
    }

    let authority = rest.trim_end_matches('/');
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| invalid("bad port"))?;
            (host, Some(port))
        }
        None => (authority, None),
    };
    if host.is_empty() || host.contains('/') {
        return Err(invalid("missing host"));
    }

    Ok(BusAddress {
        scheme: scheme.to_string(),
        host: host.to_string(),
        port,
    })
}

/// A connection to the message bus.
///
/// All methods take `&self`; implementations synchronise internally.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Establish the connection. Connecting an open client is a no-op.
    async fn connect(&self) -> Result<(), BusError>;

    /// Close the connection and drop every subscription it owns.
    async fn close(&self);

    /// Whether the connection is currently usable.
    fn is_connected(&self) -> bool;

    /// Publish `payload` on `subject`.
    ///
    /// Returns the number of subscribers the message was handed to.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<usize, BusError>;

    /// Publish a request whose answers should go to `reply_to`.
    async fn publish_request(
        &self,
        subject: &str,
        reply_to: &str,
        payload: Vec<u8>,
    ) -> Result<usize, BusError>;

    /// Subscribe to every subject matching `filter`.
    async fn subscribe(&self, filter: SubjectFilter) -> Result<Subscription, BusError>;

    /// A fresh, unique reply subject.
    fn new_inbox(&self) -> String {
        format!("{INBOX_PREFIX}.{}", Uuid::new_v4().simple())
    }
}

/// Opens bus clients from connection options.
pub trait BusConnector: Send + Sync {
    /// Build a client for `options`. The client is not connected yet.
    fn connect_client(&self, options: &ConnectOptions) -> Result<Arc<dyn BusClient>, BusError>;
}
