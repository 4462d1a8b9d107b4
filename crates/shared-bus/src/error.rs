//! # Bus Errors

use thiserror::Error;

/// Errors from bus client operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The client was never connected, or has been closed.
    #[error("bus client is not connected")]
    NotConnected,

    /// The bus itself is unreachable or the connection was lost.
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    /// The subject or subscription pattern is malformed.
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    /// A configured bus address could not be parsed.
    #[error("invalid bus address: {0}")]
    InvalidAddress(String),
}

impl BusError {
    /// Whether the error means the bus could not be reached at all.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::NotConnected | Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(BusError::NotConnected.is_connectivity());
        assert!(BusError::Unavailable("down".into()).is_connectivity());
        assert!(!BusError::InvalidSubject("a..b".into()).is_connectivity());
    }
}
