//! Local SOCKS5 listener loop

use super::handler::handle_connection;
use super::SocksContext;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Back-off after a failed accept (e.g. file descriptor exhaustion)
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Accept clients until the context's shutdown token is cancelled
///
/// Each client runs on its own task. The listener is dropped, and so
/// closed, when this returns.
pub async fn run_acceptor(listener: TcpListener, ctx: SocksContext) {
    if let Ok(addr) = listener.local_addr() {
        info!("SOCKS5 listener ready on {}", addr);
    }

    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => {
                debug!("SOCKS5 acceptor shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                    }
                    tokio::spawn(handle_connection(ctx.clone(), stream, peer));
                }
                Err(e) => {
                    warn!("Failed to accept SOCKS5 client: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                }
            },
        }
    }
}
