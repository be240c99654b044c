//! Transport configuration types
//!
//! Defines configuration for the relay stream transports (TCP, TLS).

use serde::{Deserialize, Serialize};

/// Transport type enumeration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportType {
    /// Plain TCP transport
    #[default]
    #[serde(rename = "tcp")]
    Tcp,
    /// TLS over TCP
    #[serde(rename = "tls")]
    Tls,
}

/// Main transport configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TransportConfig {
    /// Transport type
    #[serde(rename = "type", default)]
    pub transport_type: TransportType,

    /// TCP configuration
    #[serde(default)]
    pub tcp: TcpConfig,

    /// TLS configuration (required when `type = "tls"`)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

/// Default keepalive seconds
fn default_keepalive_secs() -> u64 {
    20
}

/// Default keepalive interval
fn default_keepalive_interval() -> u64 {
    8
}

fn default_nodelay() -> bool {
    true
}

/// TCP transport configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TcpConfig {
    /// Enable TCP_NODELAY
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,

    /// TCP keepalive timeout in seconds
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// TCP keepalive interval in seconds
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            nodelay: default_nodelay(),
            keepalive_secs: default_keepalive_secs(),
            keepalive_interval: default_keepalive_interval(),
        }
    }
}

/// TLS transport configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TlsConfig {
    /// Server name used for SNI and certificate verification
    /// (defaults to the relay host)
    #[serde(default)]
    pub hostname: Option<String>,

    /// Extra PEM root certificate to trust
    #[serde(default)]
    pub trusted_root: Option<String>,

    /// Disable certificate verification (testing only)
    #[serde(default)]
    pub skip_verify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_type_default() {
        assert_eq!(TransportType::default(), TransportType::Tcp);
    }

    #[test]
    fn test_tcp_config_default() {
        let config = TcpConfig::default();
        assert!(config.nodelay);
        assert_eq!(config.keepalive_secs, 20);
        assert_eq!(config.keepalive_interval, 8);
    }

    #[test]
    fn test_transport_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.transport_type, TransportType::Tcp);
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_tls_config_default() {
        let config = TlsConfig::default();
        assert!(config.hostname.is_none());
        assert!(config.trusted_root.is_none());
        assert!(!config.skip_verify);
    }
}
