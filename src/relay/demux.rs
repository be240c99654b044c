//! Inbound demultiplexer
//!
//! Reads frames from the relay and routes each payload to the local
//! session named by its `src_id`.

use super::{FrameSource, StreamWriter};
use crate::error::PortalError;
use crate::protocol::{Frame, Payload, Segment};
use crate::session::SessionTable;
use crate::socks::encode_udp_reply;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Routes relay frames to local sessions
#[derive(Debug, Clone)]
pub struct Demultiplexer {
    sessions: Arc<SessionTable>,
    writer: Arc<StreamWriter>,
}

impl Demultiplexer {
    /// Create a demultiplexer over the shared session table
    pub fn new(sessions: Arc<SessionTable>, writer: Arc<StreamWriter>) -> Self {
        Demultiplexer { sessions, writer }
    }

    /// Drain the relay stream until it ends
    ///
    /// Orderly end of stream returns `Ok`. A receive error is fatal and
    /// returned as [`PortalError::StreamRecv`]; malformed frames are dropped.
    /// Frames are handled one at a time, which keeps per-session order.
    pub async fn run(self, mut source: FrameSource) -> Result<(), PortalError> {
        while let Some(item) = source.next().await {
            match item {
                Ok(Ok(frame)) => self.dispatch(frame).await,
                Ok(Err(e)) => warn!("Dropping malformed frame: {}", e),
                Err(e) => return Err(PortalError::StreamRecv(e)),
            }
        }

        info!("Relay closed the stream");
        Ok(())
    }

    async fn dispatch(&self, frame: Frame) {
        match frame.payload {
            None => warn!("Ignoring frame without payload"),
            Some(Payload::Tcp(seg)) => self.deliver_tcp(seg).await,
            Some(Payload::Udp(seg)) => self.deliver_udp(seg).await,
            Some(Payload::Ping(data)) => {
                trace!("Echoing ping of {} bytes", data.len());
                if let Err(e) = self.writer.send(Payload::Ping(data)).await {
                    warn!("Failed to echo ping: {}", e);
                }
            }
        }
    }

    async fn deliver_tcp(&self, seg: Segment) {
        let Some(session) = self.sessions.tcp(&seg.src_id) else {
            warn!("No TCP session for {}, dropping {} bytes", seg.src_id, seg.data.len());
            return;
        };

        if let Err(e) = session.write(&seg.data).await {
            debug!("Local write failed for session {}: {}", seg.src_id, e);
            self.sessions.remove(&seg.src_id);
            session.close();
        }
    }

    async fn deliver_udp(&self, seg: Segment) {
        let Some(session) = self.sessions.udp(&seg.src_id) else {
            warn!("No UDP session for {}, dropping datagram", seg.src_id);
            return;
        };

        let Some(client) = session.client_addr() else {
            debug!("UDP session {} has no client yet, dropping datagram", seg.src_id);
            return;
        };

        let Ok(port) = u16::try_from(seg.dst_port) else {
            warn!("Invalid port {} in UDP reply for {}", seg.dst_port, seg.src_id);
            return;
        };

        let datagram = encode_udp_reply(&seg.dst_addr, port, &seg.data);
        if let Err(e) = session.socket().send_to(&datagram, client).await {
            warn!("Failed to deliver UDP reply to {}: {}", client, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameCodec, SessionId};
    use crate::relay::split_stream;
    use crate::session::{TcpSession, UdpSession};
    use bytes::Bytes;
    use futures::SinkExt;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream, UdpSocket};
    use tokio_util::codec::Framed;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        sessions: Arc<SessionTable>,
        relay: Framed<tokio::io::DuplexStream, FrameCodec>,
        task: tokio::task::JoinHandle<Result<(), PortalError>>,
    }

    fn start() -> Harness {
        let (agent, relay) = tokio::io::duplex(1 << 16);
        let (source, sink) = split_stream(agent);
        let sessions = Arc::new(SessionTable::new());
        let writer = Arc::new(StreamWriter::new(7, sink));
        let demux = Demultiplexer::new(sessions.clone(), writer);
        let task = tokio::spawn(demux.run(source));
        Harness {
            sessions,
            relay: Framed::new(relay, FrameCodec::new()),
            task,
        }
    }

    fn tcp_frame(id: &str, data: &'static [u8]) -> Frame {
        Frame::new(
            1,
            Some(Payload::Tcp(Segment::new(
                SessionId::from(id),
                "",
                0,
                Bytes::from_static(data),
            ))),
        )
    }

    async fn tcp_session(id: &str) -> (Arc<TcpSession>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (_read, write) = accepted.unwrap().0.into_split();
        let session = TcpSession::new(
            SessionId::from(id),
            "1.1.1.1".to_string(),
            80,
            write,
            CancellationToken::new(),
        );
        (Arc::new(session), client.unwrap())
    }

    #[tokio::test]
    async fn test_tcp_delivery_in_order() {
        let mut h = start();
        let (session, mut client) = tcp_session("x").await;
        h.sessions.insert_tcp(session).unwrap();

        h.relay.send(tcp_frame("x", b"dlrow ")).await.unwrap();
        h.relay.send(tcp_frame("x", b"")).await.unwrap();
        h.relay.send(tcp_frame("x", b"olleh")).await.unwrap();

        let mut buf = [0u8; 11];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"dlrow olleh");
    }

    #[tokio::test]
    async fn test_unknown_session_is_dropped() {
        let mut h = start();
        let (session, mut client) = tcp_session("known").await;
        h.sessions.insert_tcp(session).unwrap();

        h.relay.send(tcp_frame("nonexistent", b"lost")).await.unwrap();
        h.relay.send(Frame::registration(1)).await.unwrap();
        h.relay.send(tcp_frame("known", b"kept")).await.unwrap();

        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"kept");
        assert!(!h.task.is_finished());
    }

    #[tokio::test]
    async fn test_ping_is_echoed() {
        let mut h = start();
        let ping = Frame::new(1, Some(Payload::Ping(Bytes::from_static(b"keepalive"))));
        h.relay.send(ping).await.unwrap();

        let echo = futures::StreamExt::next(&mut h.relay)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(echo.portal_id, 7);
        assert_eq!(
            echo.payload,
            Some(Payload::Ping(Bytes::from_static(b"keepalive")))
        );
    }

    #[tokio::test]
    async fn test_udp_reply_is_wrapped() {
        let mut h = start();
        let bound = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let session = Arc::new(UdpSession::new(
            SessionId::from("u"),
            bound,
            CancellationToken::new(),
        ));
        assert!(session.pin_client(client.local_addr().unwrap()));
        h.sessions.insert_udp(session).unwrap();

        let reply = Frame::new(
            1,
            Some(Payload::Udp(Segment::new(
                SessionId::from("u"),
                "8.8.8.8",
                53,
                Bytes::from_static(b"R"),
            ))),
        );
        h.relay.send(reply).await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0, 0, 0, 1, 8, 8, 8, 8, 0, 53, b'R']);
    }

    #[tokio::test]
    async fn test_end_of_stream_is_ok() {
        let h = start();
        drop(h.relay);
        assert!(h.task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_fatal() {
        let h = start();
        let mut raw = h.relay.into_inner();
        let len = (crate::protocol::MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut raw, &len)
            .await
            .unwrap();

        let result = h.task.await.unwrap();
        assert!(matches!(result, Err(PortalError::StreamRecv(_))));
    }

    #[tokio::test]
    async fn test_failed_local_write_removes_session() {
        let mut h = start();
        let (session, client) = tcp_session("gone").await;
        let closed = session.closed().clone();
        h.sessions.insert_tcp(session).unwrap();
        drop(client);

        // The first writes may still be buffered by the kernel
        for _ in 0..64 {
            h.relay.send(tcp_frame("gone", &[0u8; 1024])).await.unwrap();
            if closed.is_cancelled() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(closed.is_cancelled());
        assert!(h.sessions.tcp(&SessionId::from("gone")).is_none());
    }
}
