//! SOCKS5 reply builder
//!
//! Every reply is the fixed 10-byte IPv4 form with a zero bind address.

use crate::error::Socks5ReplyCode;
use crate::socks::consts::*;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Build a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' | X'01'| 0.0.0.0  |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// `bind_port` is the bound UDP port for UDP ASSOCIATE and zero otherwise.
pub fn reply_bytes(code: Socks5ReplyCode, bind_port: u16) -> [u8; SOCKS5_REPLY_LEN] {
    let [port_hi, port_lo] = bind_port.to_be_bytes();
    [
        SOCKS5_VERSION,
        code.into(),
        SOCKS5_RESERVED,
        SOCKS5_ADDR_TYPE_IPV4,
        0,
        0,
        0,
        0,
        port_hi,
        port_lo,
    ]
}

/// Write a reply to the client
pub async fn send_reply<S>(
    stream: &mut S,
    code: Socks5ReplyCode,
    bind_port: u16,
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&reply_bytes(code, bind_port)).await?;
    stream.flush().await
}
