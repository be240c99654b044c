//! Relay stream module for Portal Socks
//!
//! Splits the relay connection into an inbound frame source owned by the
//! [`Demultiplexer`] and an outbound sink owned by the [`StreamWriter`].

mod demux;
mod writer;

pub use demux::Demultiplexer;
pub use writer::{register, StreamWriter};

use crate::protocol::FrameCodec;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};

/// Inbound half of the relay stream
pub type FrameSource = FramedRead<Box<dyn AsyncRead + Send + Unpin>, FrameCodec>;

/// Outbound half of the relay stream
pub type FrameSink = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, FrameCodec>;

/// Split a relay connection into framed halves
pub fn split_stream<S>(stream: S) -> (FrameSource, FrameSink)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read, write) = tokio::io::split(stream);
    let read: Box<dyn AsyncRead + Send + Unpin> = Box::new(read);
    let write: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write);
    (
        FramedRead::new(read, FrameCodec::new()),
        FramedWrite::new(write, FrameCodec::new()),
    )
}
