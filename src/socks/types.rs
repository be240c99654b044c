//! SOCKS5 type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - forward a byte stream through the relay
    Connect,
    /// TCP BIND (not supported)
    Bind,
    /// UDP ASSOCIATE - forward datagrams through the relay
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }
}

/// Target address for SOCKS5 requests
///
/// Represents the destination address in a SOCKS5 request.
/// Can be an IP address (v4 or v6) or a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: String, port: u16) -> Self {
        TargetAddr::Domain(domain, port)
    }

    /// Host as carried in relay frames
    ///
    /// IPv4 in dotted form, IPv6 in colon form without brackets, domains
    /// verbatim.
    pub fn host(&self) -> String {
        match self {
            TargetAddr::Ip(addr) => addr.ip().to_string(),
            TargetAddr::Domain(domain, _) => domain.clone(),
        }
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Serialize as ATYP, address and port
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV4);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV6);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Domain(domain, port) => {
                bytes.push(SOCKS5_ADDR_TYPE_DOMAIN);
                bytes.push(domain.len() as u8);
                bytes.extend_from_slice(domain.as_bytes());
                bytes.extend_from_slice(&port.to_be_bytes());
            }
        }

        bytes
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socks_command_from_byte() {
        assert_eq!(SocksCommand::from_byte(0x01), Some(SocksCommand::Connect));
        assert_eq!(SocksCommand::from_byte(0x02), Some(SocksCommand::Bind));
        assert_eq!(
            SocksCommand::from_byte(0x03),
            Some(SocksCommand::UdpAssociate)
        );
        assert_eq!(SocksCommand::from_byte(0x09), None);
    }

    #[test]
    fn test_target_addr_host_rendering() {
        let v4 = TargetAddr::ipv4(Ipv4Addr::new(1, 1, 1, 1), 80);
        assert_eq!(v4.host(), "1.1.1.1");
        assert_eq!(v4.port(), 80);

        let v6 = TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 443);
        assert_eq!(v6.host(), "::1");
        assert_eq!(v6.to_string(), "[::1]:443");

        let domain = TargetAddr::domain("example.com".to_string(), 8080);
        assert_eq!(domain.host(), "example.com");
        assert_eq!(domain.port(), 8080);
    }

    #[test]
    fn test_target_addr_to_bytes() {
        let v4 = TargetAddr::ipv4(Ipv4Addr::new(8, 8, 8, 8), 53);
        assert_eq!(v4.to_bytes(), vec![1, 8, 8, 8, 8, 0, 53]);

        let domain = TargetAddr::domain("a.io".to_string(), 80);
        assert_eq!(domain.to_bytes(), vec![3, 4, b'a', b'.', b'i', b'o', 0, 80]);

        let v6 = TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 1);
        let bytes = v6.to_bytes();
        assert_eq!(bytes.len(), 1 + 16 + 2);
        assert_eq!(bytes[0], SOCKS5_ADDR_TYPE_IPV6);
    }
}
