//! TLS transport implementation
//!
//! Provides TLS-encrypted relay connections using rustls.

use super::{RelayAddr, SocketOpts, Transport};
use crate::config::{TlsConfig, TransportConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

/// TLS stream type alias
pub type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// TLS transport for encrypted relay connections
#[derive(Clone)]
pub struct TlsTransport {
    /// TLS connector
    connector: TlsConnector,
    /// SNI override; the relay host is used when absent
    hostname: Option<String>,
    /// Connection timeout (TCP connect and handshake each)
    connect_timeout: Duration,
}

impl std::fmt::Debug for TlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTransport")
            .field("hostname", &self.hostname)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl TlsTransport {
    /// Create a new TLS transport with the given configuration
    pub fn with_config(config: &TlsConfig) -> Result<Self> {
        let tls_config = if config.skip_verify {
            tracing::warn!("TLS certificate verification is disabled");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        } else {
            ClientConfig::builder()
                .with_root_certificates(load_roots(config)?)
                .with_no_client_auth()
        };

        Ok(TlsTransport {
            connector: TlsConnector::from(Arc::new(tls_config)),
            hostname: config.hostname.clone(),
            connect_timeout: Duration::from_secs(10),
        })
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn server_name(&self, addr: &RelayAddr) -> Result<ServerName<'static>> {
        let hostname = self.hostname.as_deref().unwrap_or_else(|| addr.host());
        ServerName::try_from(hostname.to_string())
            .with_context(|| format!("Invalid hostname: {}", hostname))
    }
}

fn load_roots(config: &TlsConfig) -> Result<RootCertStore> {
    let mut root_store = RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    for err in &native_certs.errors {
        tracing::debug!("Skipping native certificate source: {}", err);
    }
    let (added, ignored) = root_store.add_parsable_certificates(native_certs.certs);
    tracing::debug!("Loaded {} native roots ({} ignored)", added, ignored);

    if let Some(ref root_path) = config.trusted_root {
        let file = std::fs::File::open(root_path)
            .with_context(|| format!("Failed to open certificate file: {}", root_path))?;
        let mut reader = BufReader::new(file);
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to parse certificates from: {}", root_path))?;
        for cert in certs {
            root_store
                .add(cert)
                .with_context(|| "Failed to add certificate to store")?;
        }
    }

    Ok(root_store)
}

/// Certificate verifier that accepts everything (`skip_verify`)
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

#[async_trait]
impl Transport for TlsTransport {
    type Stream = TlsStream;

    fn new(config: &TransportConfig) -> Result<Self> {
        let tls_config = config
            .tls
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("TLS configuration required for TLS transport"))?;

        TlsTransport::with_config(tls_config)
    }

    fn hint(conn: &Self::Stream, opts: SocketOpts) {
        let (tcp, _) = conn.get_ref();
        if let Err(e) = opts.apply(tcp) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }
    }

    async fn connect(&self, addr: &RelayAddr) -> Result<Self::Stream> {
        let resolved = addr.resolve().await?;
        let server_name = self.server_name(addr)?;

        let tcp_stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(resolved))
            .await
            .with_context(|| format!("Connection timeout to {}", addr))?
            .with_context(|| format!("Failed to connect to {}", addr))?;

        let tls_stream = tokio::time::timeout(
            self.connect_timeout,
            self.connector.connect(server_name, tcp_stream),
        )
        .await
        .with_context(|| format!("TLS handshake timeout with {}", addr))?
        .with_context(|| format!("TLS handshake failed with {}", addr))?;

        tracing::debug!("TLS connection established to {} ({})", addr, resolved);

        Ok(tls_stream)
    }
}
