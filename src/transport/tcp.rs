//! TCP transport implementation
//!
//! Provides plain TCP connections to the relay.

use super::{RelayAddr, SocketOpts, Transport};
use crate::config::TransportConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP transport for plain connections
///
/// Socket options are applied by the caller through [`Transport::hint`].
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Connection timeout
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a new TCP transport with default options
    pub fn with_defaults() -> Self {
        TcpTransport {
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    fn new(_config: &TransportConfig) -> Result<Self> {
        Ok(TcpTransport::with_defaults())
    }

    fn hint(conn: &Self::Stream, opts: SocketOpts) {
        if let Err(e) = opts.apply(conn) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }
    }

    async fn connect(&self, addr: &RelayAddr) -> Result<Self::Stream> {
        let resolved = addr.resolve().await?;

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(resolved))
            .await
            .with_context(|| format!("Connection timeout to {}", addr))?
            .with_context(|| format!("Failed to connect to {}", addr))?;

        tracing::debug!("TCP connection established to {}", resolved);

        Ok(stream)
    }
}
