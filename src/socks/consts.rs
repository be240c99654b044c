//! SOCKS5 protocol constants
//!
//! Defines the constants used by the local SOCKS5 listener.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (not supported)
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

/// Length of every reply the agent sends
pub const SOCKS5_REPLY_LEN: usize = 10;

/// Minimum SOCKS5 UDP request header accepted
pub const MIN_UDP_HEADER_LEN: usize = 10;

// Buffer sizes
/// Read size for CONNECT sessions, one relay frame per read
pub const TCP_READ_BUFFER_SIZE: usize = 32 * 1024;
/// Receive buffer for UDP ASSOCIATE sockets
pub const UDP_BUFFER_SIZE: usize = 65535;
