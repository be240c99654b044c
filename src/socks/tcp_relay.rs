//! TCP forwarding for SOCKS5 CONNECT
//!
//! Bytes read from the client become relay TCP frames; relay replies are
//! written back by the demultiplexer through the shared session handle.

use crate::error::{PortalError, Socks5ReplyCode};
use crate::protocol::{Payload, Segment, SessionId};
use crate::session::TcpSession;
use crate::socks::command::reply_bytes;
use crate::socks::consts::TCP_READ_BUFFER_SIZE;
use crate::socks::types::TargetAddr;
use crate::socks::SocksContext;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Handle TCP CONNECT command
///
/// This function:
/// 1. Registers the session so relay replies can find it
/// 2. Sends the success reply
/// 3. Forwards client bytes to the relay until EOF or a read error
pub async fn handle_tcp_connect(
    ctx: &SocksContext,
    id: &SessionId,
    stream: TcpStream,
    target: TargetAddr,
    closed: CancellationToken,
) -> Result<(), PortalError> {
    let (mut reader, writer) = stream.into_split();
    let host = target.host();
    let port = target.port();

    let session = Arc::new(TcpSession::new(
        id.clone(),
        host.clone(),
        port,
        writer,
        closed,
    ));

    if let Err(e) = ctx.sessions.insert_tcp(session.clone()) {
        session
            .write(&reply_bytes(Socks5ReplyCode::GeneralFailure, 0))
            .await?;
        return Err(e);
    }

    session
        .write(&reply_bytes(Socks5ReplyCode::Succeeded, 0))
        .await?;
    info!("Session {} CONNECT to {}", id, target);

    let mut buf = vec![0u8; TCP_READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Session {} client closed", id);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                debug!("Session {} read error: {}", id, e);
                break;
            }
        };

        let segment = Segment::new(
            id.clone(),
            host.clone(),
            u32::from(port),
            Bytes::copy_from_slice(&buf[..n]),
        );
        ctx.writer.send(Payload::Tcp(segment)).await?;
    }

    Ok(())
}
