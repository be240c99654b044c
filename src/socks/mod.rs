//! SOCKS5 module for Portal Socks
//!
//! This module implements the local SOCKS5 listener. Every accepted client
//! becomes a session whose traffic is multiplexed onto the relay stream.

mod acceptor;
mod command;
mod consts;
mod handler;
mod handshake;
mod tcp_relay;
mod types;
mod udp;

pub use acceptor::run_acceptor;
pub use command::{parse_request, reply_bytes, send_reply, SocksRequest};
pub use consts::*;
pub use handler::handle_connection;
pub use handshake::negotiate;
pub use types::{SocksCommand, TargetAddr};
pub use udp::{encode_udp_packet, encode_udp_reply, parse_udp_packet, UdpPacket};

use crate::relay::StreamWriter;
use crate::session::SessionTable;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every connection task
#[derive(Debug, Clone)]
pub struct SocksContext {
    /// Live sessions, shared with the demultiplexer
    pub sessions: Arc<SessionTable>,
    /// Outbound relay stream
    pub writer: Arc<StreamWriter>,
    /// Parent of every session token
    pub shutdown: CancellationToken,
}

impl SocksContext {
    /// Create a new context
    pub fn new(
        sessions: Arc<SessionTable>,
        writer: Arc<StreamWriter>,
        shutdown: CancellationToken,
    ) -> Self {
        SocksContext {
            sessions,
            writer,
            shutdown,
        }
    }
}
