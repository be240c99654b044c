//! Transport module for Portal Socks
//!
//! This module provides the byte transports that carry the relay stream
//! (plain TCP and TLS).

mod addr;
mod tcp;
#[cfg(feature = "rustls-tls")]
mod tls;

pub use addr::RelayAddr;
pub use tcp::TcpTransport;
#[cfg(feature = "rustls-tls")]
pub use tls::{TlsStream, TlsTransport};

use crate::config::{TcpConfig, TransportConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for configuring connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: Some(config.keepalive_secs),
            keepalive_interval: Some(config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// Transport trait for relay connections
///
/// Implementations connect to the relay endpoint and return a full-duplex
/// byte stream that the frame codec runs on.
#[async_trait]
pub trait Transport: Debug + Send + Sync + 'static {
    /// The stream type produced by this transport
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + Debug + 'static;

    /// Create a new transport instance from configuration
    fn new(config: &TransportConfig) -> Result<Self>
    where
        Self: Sized;

    /// Apply socket options to an established connection
    fn hint(conn: &Self::Stream, opts: SocketOpts);

    /// Connect to the relay
    async fn connect(&self, addr: &RelayAddr) -> Result<Self::Stream>;
}
