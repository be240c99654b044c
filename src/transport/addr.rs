//! Relay endpoint addressing
//!
//! Accepts `host:port`, `[v6]:port`, or a URL such as `https://relay.example.com`.

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::net::SocketAddr;
use url::Url;

/// Parsed relay endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAddr {
    /// Host name or IP literal (IPv6 without brackets)
    host: String,
    /// Port number
    port: u16,
}

impl RelayAddr {
    /// Create a relay address from its parts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RelayAddr {
            host: host.into(),
            port,
        }
    }

    /// Parse a relay endpoint string
    ///
    /// URLs without an explicit port use the scheme's default port.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("Relay address is empty");
        }

        if input.contains("://") {
            let url = Url::parse(input).with_context(|| format!("Invalid relay URL: {}", input))?;
            let host = url
                .host_str()
                .ok_or_else(|| anyhow!("Relay URL has no host: {}", input))?;
            let port = url
                .port_or_known_default()
                .ok_or_else(|| anyhow!("Relay URL has no port: {}", input))?;
            return Ok(RelayAddr::new(strip_brackets(host), port));
        }

        if let Ok(addr) = input.parse::<SocketAddr>() {
            return Ok(RelayAddr::new(addr.ip().to_string(), addr.port()));
        }

        let (host, port) = input
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("Relay address must be host:port or a URL: {}", input))?;
        let port: u16 = port
            .parse()
            .with_context(|| format!("Invalid relay port in: {}", input))?;
        let host = strip_brackets(host);
        if host.is_empty() {
            bail!("Relay address has no host: {}", input);
        }

        Ok(RelayAddr::new(host, port))
    }

    /// Host part
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to the first socket address
    pub async fn resolve(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Failed to resolve address: {}", self))?
            .next()
            .with_context(|| format!("No addresses found for: {}", self))
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

impl fmt::Display for RelayAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for RelayAddr {
    fn from(addr: SocketAddr) -> Self {
        RelayAddr::new(addr.ip().to_string(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_parse_host_port() {
        let addr = RelayAddr::parse("relay.example.com:8000").unwrap();
        assert_eq!(addr.host(), "relay.example.com");
        assert_eq!(addr.port(), 8000);
        assert_eq!(addr.to_string(), "relay.example.com:8000");
    }

    #[test]
    fn test_parse_ipv6_literal() {
        let addr = RelayAddr::parse("[::1]:9000").unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.port(), 9000);
        assert_eq!(addr.to_string(), "[::1]:9000");
    }

    #[test]
    fn test_parse_url_with_default_port() {
        let addr = RelayAddr::parse("https://relay.example.com").unwrap();
        assert_eq!(addr.host(), "relay.example.com");
        assert_eq!(addr.port(), 443);

        let addr = RelayAddr::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(addr.host(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_parse_url_ipv6() {
        let addr = RelayAddr::parse("http://[::1]:8080").unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RelayAddr::parse("").is_err());
        assert!(RelayAddr::parse("no-port").is_err());
        assert!(RelayAddr::parse("host:notaport").is_err());
        assert!(RelayAddr::parse(":8000").is_err());
    }

    #[test]
    fn test_from_socket_addr() {
        let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 443);
        let addr = RelayAddr::from(socket_addr);
        assert_eq!(addr.to_string(), "10.0.0.1:443");
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = RelayAddr::parse("127.0.0.1:8080").unwrap();
        let resolved = addr.resolve().await.unwrap();

        assert_eq!(resolved.ip(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(resolved.port(), 8080);
    }
}
