//! # Portal Socks - SOCKS5 over a multiplexed relay stream
//!
//! Portal Socks is a tunnel agent. It opens one long-lived stream to a relay,
//! registers under a numeric portal id, and serves a local SOCKS5 listener.
//! Every local CONNECT or UDP ASSOCIATE session is multiplexed onto that single
//! stream as length-delimited frames tagged with a per-session id.
//!
//! ## Features
//!
//! - **Single Relay Stream**: All sessions share one framed connection
//! - **TCP CONNECT**: Byte streams forwarded in order per session
//! - **UDP ASSOCIATE**: Datagrams forwarded with SOCKS5 UDP headers restored
//! - **TCP and TLS Transports**: Plain TCP or rustls-backed TLS to the relay
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portal_socks::config::load_config;
//! use portal_socks::agent::run_agent;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let shutdown = CancellationToken::new();
//!
//!     run_agent(config.agent, shutdown).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Portal Socks (listener) => relay stream => Relay -> Target
//! ```
//!
//! The demultiplexer routes inbound frames to sessions by id; every outbound
//! frame goes through one serialized writer.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod agent;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use agent::{run_agent, Agent, Tunnel};
pub use config::{load_config, AgentConfig, Config};
pub use error::{MalformedFrame, PortalError, Socks5Error};

/// Version of the Portal Socks library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
