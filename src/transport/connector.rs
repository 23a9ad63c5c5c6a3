//! Outbound stream establishment.
//!
//! [`Connector`] is the seam between the session layer and the network.
//! [`TlsConnector`] is the production implementation: TCP, then TLS with
//! certificate validation against the configured host name.
//!
//! # Connection Flow
//!
//! 1. Resolve and connect `host:port` (bounded by the connect timeout)
//! 2. Wrap the socket in TLS using the `webpki-roots` trust store
//! 3. Hand the encrypted stream to [`Session`](super::Session)

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use crate::bot::ServerConfig;
use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Byte stream the session runs over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Owned, type-erased transport.
pub type BoxedTransport = Box<dyn Transport>;

// ============================================================================
// Connector
// ============================================================================

/// Opens the transport for one connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `server`.
    ///
    /// # Errors
    ///
    /// Any error is treated as a failed connection attempt.
    async fn connect(&self, server: &ServerConfig) -> Result<BoxedTransport>;
}

// ============================================================================
// TlsConnector
// ============================================================================

/// TCP connector with TLS on top.
///
/// TLS is skipped only when [`ServerConfig::tls`] is `false`. There is no
/// way to disable certificate validation.
#[derive(Clone)]
pub struct TlsConnector {
    /// rustls connector holding the client configuration.
    tls: tokio_rustls::TlsConnector,
    /// Upper bound for TCP connect and TLS negotiation, each.
    connect_timeout: Duration,
}

impl fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConnector")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl TlsConnector {
    /// Creates a connector trusting the bundled Mozilla root set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the crypto provider rejects the default
    /// protocol versions.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            tls: tokio_rustls::TlsConnector::from(Arc::new(config)),
            connect_timeout,
        })
    }

    /// Returns the per-step connect timeout.
    #[inline]
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn timeout_error(&self) -> Error {
        let timeout_ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);
        Error::connection_timeout(timeout_ms)
    }
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<BoxedTransport> {
        let tcp = timeout(
            self.connect_timeout,
            TcpStream::connect((server.host.as_str(), server.port)),
        )
        .await
        .map_err(|_| self.timeout_error())?
        .map_err(|e| Error::connection(format!("TCP connect to {server} failed: {e}")))?;

        tcp.set_nodelay(true)?;
        debug!(%server, "TCP connected");

        if !server.tls {
            return Ok(Box::new(tcp));
        }

        let name = ServerName::try_from(server.host.clone())
            .map_err(|_| Error::invalid_server_name(&server.host))?;

        let stream = timeout(self.connect_timeout, self.tls.connect(name, tcp))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| Error::connection(format!("TLS handshake with {server} failed: {e}")))?;

        debug!(%server, "TLS handshake complete");

        Ok(Box::new(stream))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    fn server(host: &str, port: u16, tls: bool) -> ServerConfig {
        ServerConfig {
            host: host.to_string(),
            port,
            tls,
        }
    }

    #[test]
    fn test_new_builds_client_config() {
        let connector = TlsConnector::new(Duration::from_secs(3)).expect("default TLS config");
        assert_eq!(connector.connect_timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_plain_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let connector = TlsConnector::new(Duration::from_secs(5)).expect("default TLS config");
        let target = server("127.0.0.1", port, false);
        let (connected, accepted) = tokio::join!(
            connector.connect(&target),
            listener.accept(),
        );

        assert!(connected.is_ok());
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_refused_connect_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let connector = TlsConnector::new(Duration::from_secs(5)).expect("default TLS config");
        let err = connector
            .connect(&server("127.0.0.1", port, false))
            .await
            .err()
            .expect("nothing listens on the port");

        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_tls_handshake_failure_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        // Accept and hang up immediately: the TLS handshake cannot complete.
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        });

        let connector = TlsConnector::new(Duration::from_secs(5)).expect("default TLS config");
        let err = connector
            .connect(&server("localhost", port, true))
            .await
            .err()
            .expect("handshake must fail");

        assert!(err.is_connection_error());
    }
}
