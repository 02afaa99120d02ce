//! Transport registry for the primitives operations are built on
//!
//! The harness never performs I/O itself. Each operation kind is routed to the
//! first registered transport that supports it, the same way whether it is a
//! real file system, a real HTTP client, or a test double.

pub mod file;
pub mod http;

pub use file::FileTransport;
pub use http::HttpTransport;

use async_trait::async_trait;
use std::path::Path;

use crate::bench::config::BenchConfig;
use crate::bench::core::{BenchError, OperationKind, Result};

/// The I/O primitives an operation may call
///
/// Implementations only override the primitives for the kinds they report in
/// `supports`; the defaults reject the call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether this transport can perform operations of `kind`
    fn supports(&self, kind: OperationKind) -> bool;

    /// Read the whole file at `path`
    async fn read(&self, _path: &Path) -> Result<Vec<u8>> {
        Err(BenchError::UnsupportedOperation { kind: OperationKind::Read })
    }

    /// Create or overwrite the file at `path` with `data`
    async fn write(&self, _path: &Path, _data: &[u8]) -> Result<()> {
        Err(BenchError::UnsupportedOperation { kind: OperationKind::Write })
    }

    /// GET `url` and return the response status
    async fn get(&self, _url: &str) -> Result<u16> {
        Err(BenchError::UnsupportedOperation { kind: OperationKind::Request })
    }
}

/// Registry routing operation kinds to transports
pub struct TransportRegistry {
    transports: Vec<Box<dyn Transport>>,
}

impl TransportRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            transports: Vec::new(),
        }
    }

    /// Register a transport; earlier registrations win
    pub fn register<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transports.push(Box::new(transport));
        self
    }

    /// File system plus HTTP, configured from `config`
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        Ok(Self::new()
            .register(FileTransport::new())
            .register(HttpTransport::from_config(config)?))
    }

    /// Find the transport for `kind`
    pub fn find_transport(&self, kind: OperationKind) -> Result<&dyn Transport> {
        self.transports
            .iter()
            .find(|t| t.supports(kind))
            .map(|t| t.as_ref())
            .ok_or(BenchError::UnsupportedOperation { kind })
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_kinds_to_supporting_transport() {
        let registry = TransportRegistry::new().register(FileTransport::new());

        assert!(registry.find_transport(OperationKind::Read).is_ok());
        assert!(registry.find_transport(OperationKind::Write).is_ok());
        assert!(matches!(
            registry.find_transport(OperationKind::Request),
            Err(BenchError::UnsupportedOperation { kind: OperationKind::Request })
        ));
    }

    #[tokio::test]
    async fn default_primitives_reject_calls() {
        let transport = FileTransport::new();
        let err = transport.get("http://localhost/").await.unwrap_err();
        assert_eq!(err.category(), "unsupported_operation");
    }
}
