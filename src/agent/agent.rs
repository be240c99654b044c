//! Main agent structure
//!
//! Connects to the relay over a transport and runs a [`Tunnel`] on it.

use super::tunnel::Tunnel;
use crate::config::AgentConfig;
use crate::error::PortalError;
use crate::transport::{RelayAddr, SocketOpts, Transport};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Tunnel agent over transport `T`
#[derive(Debug)]
pub struct Agent<T: Transport> {
    /// Agent configuration
    config: AgentConfig,
    /// Transport layer
    transport: Arc<T>,
}

impl<T: Transport> Agent<T> {
    /// Create a new agent with the given configuration
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(T::new(&config.transport)?);
        Ok(Agent { config, transport })
    }

    /// Run the agent until shutdown or a fatal error
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!("Starting portal agent");
        info!("Relay: {}", self.config.relay_addr);
        info!("Portal id: {}", self.config.portal_id);

        let relay = RelayAddr::parse(&self.config.relay_addr)
            .map_err(|e| PortalError::ConfigInvalid(format!("{:#}", e)))?;

        let stream = tokio::select! {
            connected = self.transport.connect(&relay) => {
                connected.map_err(|e| PortalError::TransportConnect(format!("{:#}", e)))?
            }
            _ = shutdown.cancelled() => {
                info!("Shutdown before relay connection was established");
                return Ok(());
            }
        };
        T::hint(&stream, SocketOpts::from_tcp_config(&self.config.transport.tcp));
        info!("Connected to relay at {}", relay);

        let tunnel = tokio::select! {
            opened = Tunnel::open(stream, self.config.portal_id) => opened?,
            _ = shutdown.cancelled() => {
                info!("Shutdown before registration completed");
                return Ok(());
            }
        };

        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| {
                format!("Failed to bind SOCKS5 listener on {}", self.config.listen_addr)
            })?;

        if let Err(e) = tunnel.serve(listener, shutdown).await {
            error!("Tunnel error: {}", e);
            return Err(e.into());
        }

        info!("Agent stopped");
        Ok(())
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
