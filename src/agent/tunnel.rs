//! Relay tunnel lifecycle
//!
//! Owns one registered relay stream and runs the demultiplexer and the
//! SOCKS5 acceptor on it until shutdown or stream loss.

use crate::error::PortalError;
use crate::relay::{register, split_stream, Demultiplexer, FrameSource, StreamWriter};
use crate::session::SessionTable;
use crate::socks::{run_acceptor, SocksContext};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on flushing the write half during teardown
const WRITER_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A registered relay stream, ready to serve local clients
pub struct Tunnel {
    source: FrameSource,
    writer: Arc<StreamWriter>,
    sessions: Arc<SessionTable>,
}

impl std::fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tunnel")
            .field("writer", &self.writer)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Tunnel {
    /// Split the stream and send the registration frame
    ///
    /// Registration is the first frame on the stream and is sent before
    /// any other producer exists.
    pub async fn open<S>(stream: S, portal_id: i64) -> Result<Self, PortalError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (source, mut sink) = split_stream(stream);
        register(&mut sink, portal_id).await?;
        info!("Registered with relay as portal {}", portal_id);

        Ok(Tunnel {
            source,
            writer: Arc::new(StreamWriter::new(portal_id, sink)),
            sessions: Arc::new(SessionTable::new()),
        })
    }

    /// Shared session table
    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    /// Serve SOCKS5 clients from `listener` until shutdown or stream end
    ///
    /// Returns `Ok` on cancellation or orderly end of the relay stream and
    /// the receive error otherwise. On the way out the acceptor is stopped,
    /// every session is cancelled and the stream write half is closed,
    /// giving up on the flush after a short deadline.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), PortalError> {
        let Tunnel {
            source,
            writer,
            sessions,
        } = self;

        let demux = Demultiplexer::new(sessions.clone(), writer.clone());
        let mut demux_task = tokio::spawn(demux.run(source));

        let acceptor_token = shutdown.child_token();
        let ctx = SocksContext::new(sessions.clone(), writer.clone(), acceptor_token.clone());
        let acceptor_task = tokio::spawn(run_acceptor(listener, ctx));

        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received, stopping tunnel");
                Ok(())
            }
            joined = &mut demux_task => match joined {
                Ok(result) => result,
                Err(e) => Err(PortalError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("demultiplexer task failed: {}", e),
                ))),
            },
        };

        demux_task.abort();
        acceptor_token.cancel();
        if let Err(e) = acceptor_task.await {
            warn!("SOCKS5 acceptor task failed: {}", e);
        }
        sessions.close_all();

        // A relay that stopped reading must not block the exit
        match tokio::time::timeout(WRITER_CLOSE_TIMEOUT, writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Failed to close relay stream: {}", e),
            Err(_) => warn!("Relay stream did not drain in time, dropping it"),
        }

        result
    }
}
