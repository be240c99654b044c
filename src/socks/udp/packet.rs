//! UDP packet encoding/decoding for SOCKS5
//!
//! Handles the encapsulation format for UDP packets in SOCKS5.

use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use anyhow::{bail, Context, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// UDP packet structure for SOCKS5
///
/// # UDP Request/Response Format
///
/// ```text
/// +----+------+------+----------+----------+----------+
/// |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
/// +----+------+------+----------+----------+----------+
/// | 2  |  1   |  1   | Variable |    2     | Variable |
/// +----+------+------+----------+----------+----------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    /// Target address
    pub addr: TargetAddr,
    /// Packet data
    pub data: Bytes,
}

impl UdpPacket {
    /// Create a new UDP packet
    pub fn new(addr: TargetAddr, data: Bytes) -> Self {
        UdpPacket { addr, data }
    }
}

/// Parse a client datagram
///
/// Fragmented datagrams (FRAG != 0) are rejected.
pub fn parse_udp_packet(data: &[u8]) -> Result<UdpPacket> {
    if data.len() < MIN_UDP_HEADER_LEN {
        bail!("UDP packet too short: {} bytes", data.len());
    }

    let mut buf = data;

    let rsv = buf.get_u16();
    if rsv != 0 {
        bail!("Invalid RSV field: {}", rsv);
    }

    let frag = buf.get_u8();
    if frag != 0 {
        bail!("Fragmented UDP packet: frag={}", frag);
    }

    let atyp = buf.get_u8();
    let (addr, remaining) = parse_address_from_buf(atyp, buf)?;

    Ok(UdpPacket {
        addr,
        data: Bytes::copy_from_slice(remaining),
    })
}

/// Parse address from buffer
fn parse_address_from_buf(atyp: u8, mut buf: &[u8]) -> Result<(TargetAddr, &[u8])> {
    match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => {
            if buf.len() < 6 {
                bail!("Buffer too short for IPv4 address");
            }
            let ip = Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
            buf = &buf[4..];
            let port = buf.get_u16();
            Ok((TargetAddr::ipv4(ip, port), buf))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            if buf.is_empty() {
                bail!("Buffer too short for domain length");
            }
            let len = buf[0] as usize;
            buf = &buf[1..];

            if buf.len() < len + 2 {
                bail!("Buffer too short for domain name");
            }
            let domain = String::from_utf8(buf[..len].to_vec())
                .with_context(|| "Invalid UTF-8 in domain")?;
            buf = &buf[len..];
            let port = buf.get_u16();
            Ok((TargetAddr::domain(domain, port), buf))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            if buf.len() < 18 {
                bail!("Buffer too short for IPv6 address");
            }
            let mut ip_bytes = [0u8; 16];
            ip_bytes.copy_from_slice(&buf[..16]);
            let ip = Ipv6Addr::from(ip_bytes);
            buf = &buf[16..];
            let port = buf.get_u16();
            Ok((TargetAddr::ipv6(ip, port), buf))
        }

        _ => bail!("Unknown address type: {}", atyp),
    }
}

/// Encode a UDP packet to bytes
pub fn encode_udp_packet(packet: &UdpPacket) -> Vec<u8> {
    let mut buf = BytesMut::new();

    buf.put_u16(0);
    buf.put_u8(0);
    buf.extend_from_slice(&packet.addr.to_bytes());
    buf.extend_from_slice(&packet.data);

    buf.to_vec()
}

/// Wrap a relay reply for delivery to the SOCKS5 client
///
/// `addr` is the host string from the relay frame. IP literals keep their
/// family; anything else is sent as IPv4 `0.0.0.0` so the datagram stays
/// well-formed.
pub fn encode_udp_reply(addr: &str, port: u16, data: &[u8]) -> Vec<u8> {
    let host = addr
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(addr);

    let ip = host
        .parse::<IpAddr>()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let mut buf = BytesMut::with_capacity(4 + 16 + 2 + data.len());
    buf.put_u16(0);
    buf.put_u8(0);
    match ip {
        IpAddr::V4(v4) => {
            buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
            buf.put_slice(&v4.octets());
        }
        IpAddr::V6(v6) => {
            buf.put_u8(SOCKS5_ADDR_TYPE_IPV6);
            buf.put_slice(&v6.octets());
        }
    }
    buf.put_u16(port);
    buf.put_slice(data);

    buf.to_vec()
}
