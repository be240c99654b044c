//! UDP support for SOCKS5
//!
//! Implements UDP ASSOCIATE and the SOCKS5 UDP datagram header.

mod associate;
mod packet;

pub use associate::handle_udp_associate;
pub use packet::{encode_udp_packet, encode_udp_reply, parse_udp_packet, UdpPacket};
