//! Serialized writer for the outbound half of the relay stream

use super::FrameSink;
use crate::error::PortalError;
use crate::protocol::{Frame, Payload};
use futures::SinkExt;
use tokio::sync::Mutex;

/// Send the one-time registration frame
///
/// Runs on the bare sink before any [`StreamWriter`] exists, so no other
/// producer can race it.
pub async fn register(sink: &mut FrameSink, portal_id: i64) -> Result<(), PortalError> {
    sink.send(Frame::registration(portal_id))
        .await
        .map_err(PortalError::RegistrationSendFailed)?;
    tracing::debug!("Registration sent for portal {}", portal_id);
    Ok(())
}

/// Single-sender gate around the outbound stream
///
/// Every frame is stamped with the portal id. At most one send is in flight
/// at a time; after [`StreamWriter::close`] every send fails with
/// [`PortalError::StreamClosed`].
pub struct StreamWriter {
    portal_id: i64,
    sink: Mutex<Option<FrameSink>>,
}

impl std::fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamWriter")
            .field("portal_id", &self.portal_id)
            .finish_non_exhaustive()
    }
}

impl StreamWriter {
    /// Wrap a sink that has already carried the registration frame
    pub fn new(portal_id: i64, sink: FrameSink) -> Self {
        StreamWriter {
            portal_id,
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Send one payload to the relay
    ///
    /// Errors are returned unchanged; a failed send leaves the stream open.
    pub async fn send(&self, payload: Payload) -> Result<(), PortalError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(PortalError::StreamClosed)?;
        sink.send(Frame::new(self.portal_id, Some(payload)))
            .await
            .map_err(PortalError::StreamSend)
    }

    /// Flush and half-close the outbound stream
    ///
    /// Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), PortalError> {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            sink.close().await.map_err(PortalError::StreamSend)?;
            tracing::debug!("Relay stream write half closed");
        }
        Ok(())
    }

    /// Whether the outbound stream has been closed
    pub async fn is_closed(&self) -> bool {
        self.sink.lock().await.is_none()
    }
}
