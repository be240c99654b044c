//! Agent module for Portal Socks
//!
//! This module contains the supervisor that connects to the relay,
//! registers, and serves local SOCKS5 clients over the relay stream.

#[allow(clippy::module_inception)]
mod agent;
mod tunnel;

pub use agent::Agent;
pub use tunnel::Tunnel;

use crate::config::{AgentConfig, TransportType};
#[cfg(feature = "rustls-tls")]
use crate::transport::TlsTransport;
use crate::transport::TcpTransport;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the agent with the given configuration
pub async fn run_agent(config: AgentConfig, shutdown: CancellationToken) -> Result<()> {
    match config.transport.transport_type {
        TransportType::Tcp => {
            let agent = Agent::<TcpTransport>::new(config)?;
            agent.run(shutdown).await
        }
        #[cfg(feature = "rustls-tls")]
        TransportType::Tls => {
            let agent = Agent::<TlsTransport>::new(config)?;
            agent.run(shutdown).await
        }
        #[cfg(not(feature = "rustls-tls"))]
        TransportType::Tls => {
            anyhow::bail!("TLS transport is not enabled. Recompile with --features rustls-tls")
        }
    }
}
