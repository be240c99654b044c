//! Per-connection SOCKS5 handler
//!
//! Runs negotiation, request parsing and command dispatch for one accepted
//! client, then removes whatever session the connection registered.

use crate::error::{PortalError, Socks5Error, Socks5ReplyCode};
use crate::protocol::SessionId;
use crate::socks::command::{parse_request, send_reply};
use crate::socks::handshake::negotiate;
use crate::socks::tcp_relay::handle_tcp_connect;
use crate::socks::types::SocksCommand;
use crate::socks::udp::handle_udp_associate;
use crate::socks::SocksContext;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Serve one local SOCKS5 client
///
/// The connection gets a fresh session id and a child token of the agent's
/// shutdown token. Cancelling the token (agent shutdown, or the
/// demultiplexer giving up on the session) drops the connection.
pub async fn handle_connection(ctx: SocksContext, stream: TcpStream, peer: SocketAddr) {
    let id = SessionId::generate();
    let closed = ctx.shutdown.child_token();
    debug!("Session {} accepted from {}", id, peer);

    tokio::select! {
        result = serve(&ctx, &id, stream, closed.clone()) => match result {
            Ok(()) => debug!("Session {} finished", id),
            Err(PortalError::StreamSend(e)) => warn!("Session {} lost the relay stream: {}", id, e),
            Err(e) => debug!("Session {} ended: {}", id, e),
        },
        _ = closed.cancelled() => debug!("Session {} cancelled", id),
    }

    ctx.sessions.remove(&id);
    closed.cancel();
}

async fn serve(
    ctx: &SocksContext,
    id: &SessionId,
    mut stream: TcpStream,
    closed: CancellationToken,
) -> Result<(), PortalError> {
    negotiate(&mut stream).await?;

    let request = match parse_request(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            send_reply(&mut stream, e.reply_code(), 0).await?;
            return Err(e.into());
        }
    };

    match SocksCommand::from_byte(request.cmd) {
        Some(SocksCommand::Connect) => {
            handle_tcp_connect(ctx, id, stream, request.target, closed).await
        }
        Some(SocksCommand::UdpAssociate) => {
            handle_udp_associate(ctx, id, stream, closed).await
        }
        _ => {
            send_reply(&mut stream, Socks5ReplyCode::CommandNotSupported, 0).await?;
            Err(Socks5Error::CommandNotSupported(request.cmd).into())
        }
    }
}
