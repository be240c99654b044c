//! Agent configuration types
//!
//! Defines the main configuration structures for the tunnel agent.

use super::{TransportConfig, TransportType};
use crate::error::PortalError;
use serde::{Deserialize, Serialize};

/// Default local SOCKS5 listen address
pub fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Agent configuration
    pub agent: AgentConfig,
}

/// Agent configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Relay endpoint (e.g., "relay.example.com:8000" or "https://relay.example.com")
    pub relay_addr: String,

    /// Portal identifier announced to the relay
    pub portal_id: i64,

    /// Local SOCKS5 listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,
}

impl AgentConfig {
    /// Create a configuration with the default listener and plain TCP transport
    pub fn new(relay_addr: impl Into<String>, portal_id: i64) -> Self {
        AgentConfig {
            relay_addr: relay_addr.into(),
            portal_id,
            listen_addr: default_listen_addr(),
            transport: TransportConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PortalError> {
        if self.portal_id <= 0 {
            return Err(PortalError::ConfigInvalid(format!(
                "portal_id must be a positive integer, got {}",
                self.portal_id
            )));
        }
        if self.relay_addr.trim().is_empty() {
            return Err(PortalError::ConfigInvalid(
                "relay_addr is required".to_string(),
            ));
        }
        if self.listen_addr.trim().is_empty() {
            return Err(PortalError::ConfigInvalid(
                "listen_addr must not be empty".to_string(),
            ));
        }
        if self.transport.transport_type == TransportType::Tls && self.transport.tls.is_none() {
            return Err(PortalError::ConfigInvalid(
                "TLS transport selected but [agent.transport.tls] is missing".to_string(),
            ));
        }
        Ok(())
    }
}
