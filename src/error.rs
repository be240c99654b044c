//! Error types for Portal Socks
//!
//! This module defines all custom error types used throughout the agent.

use std::io;
use thiserror::Error;

/// Main error type for tunnel agent operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    ConfigInvalid(String),

    /// Could not reach the relay or open the stream
    #[error("Failed to connect to relay: {0}")]
    TransportConnect(String),

    /// The one-time registration frame could not be sent
    #[error("Failed to send registration: {0}")]
    RegistrationSendFailed(#[source] io::Error),

    /// Reading from the relay stream failed
    #[error("Relay stream receive error: {0}")]
    StreamRecv(#[source] io::Error),

    /// Writing to the relay stream failed
    #[error("Relay stream send error: {0}")]
    StreamSend(#[source] io::Error),

    /// The write half of the relay stream has been closed
    #[error("Relay stream closed")]
    StreamClosed,

    /// A session id is already registered
    #[error("Duplicate session: {0}")]
    DuplicateSession(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] Socks5Error),
}

/// Reasons a relay frame is rejected by the codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedFrame {
    /// The frame body is not a valid encoding
    #[error("undecodable body: {0}")]
    Undecodable(String),

    /// The payload tag is not one we understand
    #[error("unknown payload kind: {0}")]
    UnknownPayload(u8),

    /// A field required by the payload kind is missing
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// SOCKS5 request errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// The request ended early or the socket failed
    #[error("Failed to read request: {0}")]
    Io(#[from] io::Error),
}

impl Socks5Error {
    /// Reply code sent to the client before closing the connection
    pub fn reply_code(&self) -> Socks5ReplyCode {
        match self {
            Socks5Error::CommandNotSupported(_) => Socks5ReplyCode::CommandNotSupported,
            Socks5Error::AddressTypeNotSupported(_) => Socks5ReplyCode::AddressTypeNotSupported,
            _ => Socks5ReplyCode::GeneralFailure,
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}
