//! Relay frame type definitions
//!
//! Frames exchanged with the relay carry the portal identifier and at most
//! one payload. Outbound payloads are stamped by the stream writer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payload tag for TCP segments
pub const PAYLOAD_KIND_TCP: u8 = 1;

/// Payload tag for UDP datagrams
pub const PAYLOAD_KIND_UDP: u8 = 2;

/// Payload tag for keepalive pings
pub const PAYLOAD_KIND_PING: u8 = 3;

/// Agent-minted routing key shared by a local session and its relay flow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random (v4 UUID) session id
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        SessionId(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        SessionId(id.to_string())
    }
}

/// One TCP segment or UDP datagram travelling through the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Originating local session
    pub src_id: SessionId,
    /// Destination host (IP literal or domain name)
    pub dst_addr: String,
    /// Destination port
    pub dst_port: u32,
    /// Payload bytes
    pub data: Bytes,
}

impl Segment {
    /// Create a new segment
    pub fn new(src_id: SessionId, dst_addr: impl Into<String>, dst_port: u32, data: Bytes) -> Self {
        Segment {
            src_id,
            dst_addr: dst_addr.into(),
            dst_port,
            data,
        }
    }
}

/// Frame payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Bytes of a CONNECT session
    Tcp(Segment),
    /// A datagram of a UDP ASSOCIATE session
    Udp(Segment),
    /// Keepalive probe, echoed back unchanged
    Ping(Bytes),
}

impl Payload {
    /// Session id the payload is routed by, if any
    pub fn src_id(&self) -> Option<&SessionId> {
        match self {
            Payload::Tcp(seg) | Payload::Udp(seg) => Some(&seg.src_id),
            Payload::Ping(_) => None,
        }
    }
}

/// A message on the relay stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Portal identifier of this agent
    pub portal_id: i64,
    /// Payload, absent for the registration frame
    pub payload: Option<Payload>,
}

impl Frame {
    /// Create a new frame
    pub fn new(portal_id: i64, payload: Option<Payload>) -> Self {
        Frame { portal_id, payload }
    }

    /// The registration frame: portal id and nothing else
    pub fn registration(portal_id: i64) -> Self {
        Frame {
            portal_id,
            payload: None,
        }
    }
}

/// Serialized frame layout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct WireFrame {
    pub portal_id: i64,
    pub payload: Option<WirePayload>,
}

/// Serialized payload layout; `kind` selects the variant
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct WirePayload {
    pub kind: u8,
    pub data: Bytes,
    pub dst_addr: Option<String>,
    pub dst_port: Option<u32>,
    pub src_id: Option<String>,
    /// Reserved by the relay schema; never interpreted
    pub src_port: Option<u32>,
}
