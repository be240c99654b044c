//! Session module for Portal Socks
//!
//! Live local SOCKS5 sessions and the shared table the relay demultiplexer
//! routes inbound frames through.

mod table;

pub use table::SessionTable;

use crate::protocol::SessionId;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A CONNECT session
///
/// The owning connection task reads from the client; the write half is
/// shared between that task (for the SOCKS5 reply) and the demultiplexer.
#[derive(Debug)]
pub struct TcpSession {
    id: SessionId,
    dst_addr: String,
    dst_port: u16,
    writer: Mutex<OwnedWriteHalf>,
    closed: CancellationToken,
}

impl TcpSession {
    /// Create a session around the client write half
    pub fn new(
        id: SessionId,
        dst_addr: String,
        dst_port: u16,
        writer: OwnedWriteHalf,
        closed: CancellationToken,
    ) -> Self {
        TcpSession {
            id,
            dst_addr,
            dst_port,
            writer: Mutex::new(writer),
            closed,
        }
    }

    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Requested destination host
    pub fn dst_addr(&self) -> &str {
        &self.dst_addr
    }

    /// Requested destination port
    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    /// Write bytes to the local client
    ///
    /// The lock is held for one write only, so writes from different
    /// producers never interleave within a frame.
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        if self.closed.is_cancelled() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "session closed",
            ));
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await
    }

    /// Token cancelled when the session is torn down
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Ask the owning task to close the session
    pub fn close(&self) {
        self.closed.cancel();
    }
}

/// A UDP ASSOCIATE session
#[derive(Debug)]
pub struct UdpSession {
    id: SessionId,
    socket: Arc<UdpSocket>,
    client: OnceLock<SocketAddr>,
    closed: CancellationToken,
}

impl UdpSession {
    /// Create a session around the bound relay socket
    pub fn new(id: SessionId, socket: Arc<UdpSocket>, closed: CancellationToken) -> Self {
        UdpSession {
            id,
            socket,
            client: OnceLock::new(),
            closed,
        }
    }

    /// Session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The bound local UDP socket
    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    /// Pin the client address on first use
    ///
    /// Returns true if `addr` is (now) the pinned client.
    pub fn pin_client(&self, addr: SocketAddr) -> bool {
        *self.client.get_or_init(|| addr) == addr
    }

    /// The pinned client address, if a datagram has been received
    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client.get().copied()
    }

    /// Token cancelled when the session is torn down
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Ask the owning task to close the session
    pub fn close(&self) {
        self.closed.cancel();
    }
}
