//! UDP ASSOCIATE handler
//!
//! Binds a local UDP socket for the client and forwards its datagrams to
//! the relay. The association lives exactly as long as the TCP control
//! connection.

use super::packet::parse_udp_packet;
use crate::error::{PortalError, Socks5ReplyCode};
use crate::protocol::{Payload, Segment, SessionId};
use crate::session::UdpSession;
use crate::socks::command::send_reply;
use crate::socks::consts::UDP_BUFFER_SIZE;
use crate::socks::SocksContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Handle UDP ASSOCIATE command
///
/// # Protocol Flow
///
/// 1. Bind a UDP socket on the control connection's local IP, ephemeral port
/// 2. Register the session and reply with `0.0.0.0` and the bound port
/// 3. Forward datagrams from the first client address to the relay
/// 4. End when the control connection reaches EOF or fails
pub async fn handle_udp_associate(
    ctx: &SocksContext,
    id: &SessionId,
    mut control: TcpStream,
    closed: CancellationToken,
) -> Result<(), PortalError> {
    let socket = match bind_relay_socket(&control).await {
        Ok(socket) => Arc::new(socket),
        Err(e) => {
            send_reply(&mut control, Socks5ReplyCode::GeneralFailure, 0).await?;
            return Err(e.into());
        }
    };
    let bound_port = socket.local_addr()?.port();

    let session = Arc::new(UdpSession::new(id.clone(), socket, closed));
    if let Err(e) = ctx.sessions.insert_udp(session.clone()) {
        send_reply(&mut control, Socks5ReplyCode::GeneralFailure, 0).await?;
        return Err(e);
    }

    send_reply(&mut control, Socks5ReplyCode::Succeeded, bound_port).await?;
    info!("Session {} UDP ASSOCIATE bound on port {}", id, bound_port);

    tokio::select! {
        result = forward_datagrams(ctx, &session) => result?,
        _ = watch_control(&mut control) => {
            debug!("Session {} control connection closed", id);
        }
    }

    Ok(())
}

async fn bind_relay_socket(control: &TcpStream) -> std::io::Result<UdpSocket> {
    let local_ip = control.local_addr()?.ip();
    UdpSocket::bind(SocketAddr::new(local_ip, 0)).await
}

/// Read client datagrams and send them to the relay
///
/// Returns only on a socket or relay send failure.
async fn forward_datagrams(ctx: &SocksContext, session: &UdpSession) -> Result<(), PortalError> {
    let mut buf = vec![0u8; UDP_BUFFER_SIZE];

    loop {
        let (n, from) = session.socket().recv_from(&mut buf).await?;

        if !session.pin_client(from) {
            debug!(
                "Session {} dropping datagram from unexpected peer {}",
                session.id(),
                from
            );
            continue;
        }

        let packet = match parse_udp_packet(&buf[..n]) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Session {} dropping datagram: {}", session.id(), e);
                continue;
            }
        };

        let segment = Segment::new(
            session.id().clone(),
            packet.addr.host(),
            u32::from(packet.addr.port()),
            packet.data,
        );
        ctx.writer.send(Payload::Udp(segment)).await?;
    }
}

/// Block until the control connection ends
///
/// Bytes sent on the control connection are read and discarded.
async fn watch_control(control: &mut TcpStream) {
    let mut probe = [0u8; 1];
    loop {
        match control.read(&mut probe).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}
