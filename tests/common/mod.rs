//! Test utilities and mocks for Portal Socks
//!
//! This module provides a mock relay, a tunnel harness and SOCKS5 client
//! helpers used across integration tests.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use portal_socks::error::PortalError;
use portal_socks::protocol::{Frame, FrameCodec, Payload, Segment, SessionId};
use portal_socks::session::SessionTable;
use portal_socks::Tunnel;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

/// Portal id used by the tunnel harness
pub const PORTAL_ID: i64 = 12345;

/// Default wait for anything the test expects to happen
pub const WAIT: Duration = Duration::from_secs(5);

/// Relay end of a framed stream
pub struct MockRelay<S> {
    framed: Framed<S, FrameCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> MockRelay<S> {
    /// Wrap the relay side of a stream
    pub fn new(stream: S) -> Self {
        MockRelay {
            framed: Framed::new(stream, FrameCodec::new()),
        }
    }

    /// Raw stream, for writing bytes that bypass the codec
    pub fn get_mut(&mut self) -> &mut S {
        self.framed.get_mut()
    }

    /// Receive the next well-formed frame
    pub async fn recv(&mut self) -> Frame {
        let item = tokio::time::timeout(WAIT, self.framed.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("relay stream ended");
        item.expect("relay stream failed")
            .expect("agent sent a malformed frame")
    }

    /// Receive the next frame, or `None` once the agent closed its side
    pub async fn recv_or_eof(&mut self) -> Option<Frame> {
        let item = tokio::time::timeout(WAIT, self.framed.next())
            .await
            .expect("timed out waiting for a frame")?;
        Some(
            item.expect("relay stream failed")
                .expect("agent sent a malformed frame"),
        )
    }

    /// Receive the next frame and unwrap its TCP segment
    pub async fn recv_tcp(&mut self) -> Segment {
        match self.recv().await.payload {
            Some(Payload::Tcp(seg)) => seg,
            other => panic!("expected a TCP payload, got {:?}", other),
        }
    }

    /// Receive the next frame and unwrap its UDP segment
    pub async fn recv_udp(&mut self) -> Segment {
        match self.recv().await.payload {
            Some(Payload::Udp(seg)) => seg,
            other => panic!("expected a UDP payload, got {:?}", other),
        }
    }

    /// Send a frame to the agent
    pub async fn send(&mut self, payload: Payload) {
        self.framed
            .send(Frame::new(0, Some(payload)))
            .await
            .expect("failed to send frame to agent");
    }

    /// Send a TCP reply for a session
    pub async fn send_tcp(&mut self, id: &SessionId, data: &[u8]) {
        let seg = Segment::new(id.clone(), "", 0, bytes::Bytes::copy_from_slice(data));
        self.send(Payload::Tcp(seg)).await;
    }

    /// Send a ping and wait for its echo, proving the demultiplexer is alive
    pub async fn ping(&mut self, token: &'static [u8]) {
        self.send(Payload::Ping(bytes::Bytes::from_static(token)))
            .await;
        loop {
            let frame = self.recv().await;
            if let Some(Payload::Ping(data)) = frame.payload {
                assert_eq!(&data[..], token);
                assert_eq!(frame.portal_id, PORTAL_ID);
                return;
            }
        }
    }

    /// Expect the registration frame
    pub async fn expect_registration(&mut self, portal_id: i64) {
        let frame = self.recv().await;
        assert_eq!(frame, Frame::registration(portal_id));
    }
}

/// A tunnel served over an in-memory relay stream
pub struct TunnelHarness {
    /// Relay side of the stream
    pub relay: MockRelay<DuplexStream>,
    /// Local SOCKS5 listener address
    pub socks_addr: SocketAddr,
    /// Session table shared with the tunnel
    pub sessions: Arc<SessionTable>,
    /// Agent shutdown token
    pub shutdown: CancellationToken,
    /// The serving task
    pub task: JoinHandle<Result<(), PortalError>>,
}

impl TunnelHarness {
    /// Register a tunnel on a duplex stream and serve it on an ephemeral port
    ///
    /// The registration frame is consumed before returning.
    pub async fn start() -> Self {
        let (agent_side, relay_side) = duplex(1 << 20);
        let tunnel = Tunnel::open(agent_side, PORTAL_ID).await.unwrap();
        let sessions = tunnel.sessions().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let socks_addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(tunnel.serve(listener, shutdown.clone()));

        let mut relay = MockRelay::new(relay_side);
        relay.expect_registration(PORTAL_ID).await;

        TunnelHarness {
            relay,
            socks_addr,
            sessions,
            shutdown,
            task,
        }
    }

    /// Cancel the agent and wait for the tunnel to stop
    pub async fn stop(self) -> Result<(), PortalError> {
        self.shutdown.cancel();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("tunnel did not stop")
            .expect("tunnel task panicked")
    }
}

/// Poll `cond` until it holds or the wait expires
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Build a CONNECT request for an IPv4 target
pub fn connect_request_ipv4(ip: Ipv4Addr, port: u16) -> Vec<u8> {
    let mut req = vec![0x05, 0x01, 0x00, 0x01];
    req.extend_from_slice(&ip.octets());
    req.extend_from_slice(&port.to_be_bytes());
    req
}

/// Build a CONNECT request for a domain target
pub fn connect_request_domain(domain: &str, port: u16) -> Vec<u8> {
    let mut req = vec![0x05, 0x01, 0x00, 0x03, domain.len() as u8];
    req.extend_from_slice(domain.as_bytes());
    req.extend_from_slice(&port.to_be_bytes());
    req
}

/// Build a UDP ASSOCIATE request with an unspecified client address
pub fn udp_associate_request() -> Vec<u8> {
    vec![0x05, 0x03, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
}

/// Connect and complete the NO AUTH greeting
pub async fn socks_greet(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[0x05, 0x01, 0x00]).await.unwrap();

    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [0x05, 0x00]);

    stream
}

/// Greet, send `request`, and return the stream with the 10-byte reply
pub async fn socks_request(addr: SocketAddr, request: &[u8]) -> (TcpStream, [u8; 10]) {
    let mut stream = socks_greet(addr).await;
    stream.write_all(request).await.unwrap();

    let mut reply = [0u8; 10];
    tokio::time::timeout(WAIT, stream.read_exact(&mut reply))
        .await
        .expect("timed out waiting for SOCKS5 reply")
        .unwrap();

    (stream, reply)
}

/// Wrap a payload in a SOCKS5 UDP request header for an IPv4 target
pub fn udp_datagram_ipv4(ip: Ipv4Addr, port: u16, data: &[u8]) -> Vec<u8> {
    let mut packet = vec![0x00, 0x00, 0x00, 0x01];
    packet.extend_from_slice(&ip.octets());
    packet.extend_from_slice(&port.to_be_bytes());
    packet.extend_from_slice(data);
    packet
}
