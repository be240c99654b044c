//! SOCKS5 request parser
//!
//! Parses the client request that follows method negotiation.

use crate::error::Socks5Error;
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// A parsed SOCKS5 request
///
/// The command byte is kept raw so unsupported commands can be answered
/// after the whole request has been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocksRequest {
    /// Raw CMD byte
    pub cmd: u8,
    /// Requested destination
    pub target: TargetAddr,
}

/// Parse a SOCKS5 request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Each failure maps to a reply code through [`Socks5Error::reply_code`].
pub async fn parse_request<S>(stream: &mut S) -> Result<SocksRequest, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let cmd = header[1];
    let addr_type = header[3];

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }

    let target = parse_address(stream, addr_type).await?;

    tracing::trace!("Parsed SOCKS5 request cmd={} target={}", cmd, target);

    Ok(SocksRequest { cmd, target })
}

/// Parse the address portion of a SOCKS5 request
async fn parse_address<S>(stream: &mut S, addr_type: u8) -> Result<TargetAddr, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    match addr_type {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(TargetAddr::ipv4(Ipv4Addr::from(addr), port))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            let domain_len = stream.read_u8().await? as usize;

            let mut domain_buf = vec![0u8; domain_len];
            stream.read_exact(&mut domain_buf).await?;
            let domain = String::from_utf8(domain_buf)
                .map_err(|e| Socks5Error::InvalidDomain(e.to_string()))?;

            let port = stream.read_u16().await?;

            Ok(TargetAddr::domain(domain, port))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            let port = stream.read_u16().await?;

            Ok(TargetAddr::ipv6(Ipv6Addr::from(addr), port))
        }

        _ => Err(Socks5Error::AddressTypeNotSupported(addr_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Socks5ReplyCode;
    use std::io::Cursor;

    fn request(cmd: u8, addr: &[u8]) -> Vec<u8> {
        let mut request = vec![SOCKS5_VERSION, cmd, SOCKS5_RESERVED];
        request.extend_from_slice(addr);
        request
    }

    fn domain_addr(domain: &[u8], port: u16) -> Vec<u8> {
        let mut addr = vec![SOCKS5_ADDR_TYPE_DOMAIN, domain.len() as u8];
        addr.extend_from_slice(domain);
        addr.extend_from_slice(&port.to_be_bytes());
        addr
    }

    #[tokio::test]
    async fn test_parse_request_ipv4() {
        let data = request(SOCKS5_CMD_TCP_CONNECT, &[1, 1, 1, 1, 1, 0, 80]);
        let mut cursor = Cursor::new(data);

        let req = parse_request(&mut cursor).await.unwrap();
        assert_eq!(req.cmd, SOCKS5_CMD_TCP_CONNECT);
        assert_eq!(req.target.host(), "1.1.1.1");
        assert_eq!(req.target.port(), 80);
    }

    #[tokio::test]
    async fn test_parse_request_ipv6() {
        let mut addr = vec![SOCKS5_ADDR_TYPE_IPV6];
        addr.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        addr.extend_from_slice(&443u16.to_be_bytes());
        let mut cursor = Cursor::new(request(SOCKS5_CMD_TCP_CONNECT, &addr));

        let req = parse_request(&mut cursor).await.unwrap();
        assert_eq!(req.target.host(), "::1");
        assert_eq!(req.target.port(), 443);
    }

    #[tokio::test]
    async fn test_parse_request_domain() {
        let data = request(SOCKS5_CMD_UDP_ASSOCIATE, &domain_addr(b"example.com", 8080));
        let mut cursor = Cursor::new(data);

        let req = parse_request(&mut cursor).await.unwrap();
        assert_eq!(req.cmd, SOCKS5_CMD_UDP_ASSOCIATE);
        assert_eq!(
            req.target,
            TargetAddr::domain("example.com".to_string(), 8080)
        );
    }

    #[tokio::test]
    async fn test_parse_request_domain_length_bounds() {
        let empty = request(SOCKS5_CMD_TCP_CONNECT, &domain_addr(b"", 80));
        let req = parse_request(&mut Cursor::new(empty)).await.unwrap();
        assert_eq!(req.target.host(), "");

        let long = vec![b'a'; 255];
        let full = request(SOCKS5_CMD_TCP_CONNECT, &domain_addr(&long, 80));
        let req = parse_request(&mut Cursor::new(full)).await.unwrap();
        assert_eq!(req.target.host().len(), 255);
    }

    #[tokio::test]
    async fn test_parse_request_truncated_domain() {
        // Length byte 255 but only 254 bytes follow
        let mut addr = vec![SOCKS5_ADDR_TYPE_DOMAIN, 255];
        addr.extend_from_slice(&[b'a'; 254]);
        let mut cursor = Cursor::new(request(SOCKS5_CMD_TCP_CONNECT, &addr));

        let err = parse_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Socks5Error::Io(_)));
        assert_eq!(err.reply_code(), Socks5ReplyCode::GeneralFailure);
    }

    #[tokio::test]
    async fn test_parse_request_invalid_version() {
        let mut data = request(SOCKS5_CMD_TCP_CONNECT, &[1, 127, 0, 0, 1, 0, 80]);
        data[0] = 4;

        let err = parse_request(&mut Cursor::new(data)).await.unwrap_err();
        assert!(matches!(err, Socks5Error::UnsupportedVersion(4)));
        assert_eq!(err.reply_code(), Socks5ReplyCode::GeneralFailure);
    }

    #[tokio::test]
    async fn test_parse_request_unknown_address_type() {
        let data = request(SOCKS5_CMD_TCP_CONNECT, &[0x09, 0, 0]);

        let err = parse_request(&mut Cursor::new(data)).await.unwrap_err();
        assert!(matches!(err, Socks5Error::AddressTypeNotSupported(0x09)));
        assert_eq!(err.reply_code(), Socks5ReplyCode::AddressTypeNotSupported);
    }

    #[tokio::test]
    async fn test_parse_request_invalid_utf8_domain() {
        let data = request(SOCKS5_CMD_TCP_CONNECT, &domain_addr(&[0xFF, 0xFE], 80));

        let err = parse_request(&mut Cursor::new(data)).await.unwrap_err();
        assert!(matches!(err, Socks5Error::InvalidDomain(_)));
    }

    #[tokio::test]
    async fn test_parse_request_keeps_unknown_command() {
        let data = request(0x02, &[1, 10, 0, 0, 1, 0, 22]);

        let req = parse_request(&mut Cursor::new(data)).await.unwrap();
        assert_eq!(req.cmd, SOCKS5_CMD_TCP_BIND);
    }
}
