//! Frame codec for the relay stream
//!
//! Frames are bincode bodies behind a 4-byte big-endian length prefix.
//! Body errors are reported per frame so a single bad frame never tears
//! down the stream; only framing and I/O errors are fatal.

use super::types::{
    Frame, Payload, Segment, SessionId, WireFrame, WirePayload, PAYLOAD_KIND_PING,
    PAYLOAD_KIND_TCP, PAYLOAD_KIND_UDP,
};
use crate::error::MalformedFrame;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Maximum encoded frame length accepted on the stream
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Serialize a frame body (without the length prefix)
pub fn encode_frame(frame: &Frame) -> bincode::Result<Bytes> {
    let wire = WireFrame::from(frame);
    Ok(Bytes::from(bincode::serialize(&wire)?))
}

/// Deserialize a frame body (without the length prefix)
pub fn decode_frame(buf: &[u8]) -> Result<Frame, MalformedFrame> {
    let wire: WireFrame =
        bincode::deserialize(buf).map_err(|e| MalformedFrame::Undecodable(e.to_string()))?;
    Frame::try_from(wire)
}

impl From<&Frame> for WireFrame {
    fn from(frame: &Frame) -> Self {
        let payload = frame.payload.as_ref().map(|payload| match payload {
            Payload::Tcp(seg) => segment_to_wire(PAYLOAD_KIND_TCP, seg),
            Payload::Udp(seg) => segment_to_wire(PAYLOAD_KIND_UDP, seg),
            Payload::Ping(data) => WirePayload {
                kind: PAYLOAD_KIND_PING,
                data: data.clone(),
                dst_addr: None,
                dst_port: None,
                src_id: None,
                src_port: None,
            },
        });

        WireFrame {
            portal_id: frame.portal_id,
            payload,
        }
    }
}

fn segment_to_wire(kind: u8, seg: &Segment) -> WirePayload {
    WirePayload {
        kind,
        data: seg.data.clone(),
        dst_addr: Some(seg.dst_addr.clone()),
        dst_port: Some(seg.dst_port),
        src_id: Some(seg.src_id.to_string()),
        src_port: None,
    }
}

impl TryFrom<WireFrame> for Frame {
    type Error = MalformedFrame;

    fn try_from(wire: WireFrame) -> Result<Self, Self::Error> {
        let payload = match wire.payload {
            None => None,
            Some(p) => Some(match p.kind {
                PAYLOAD_KIND_TCP => Payload::Tcp(segment_from_wire(p)?),
                PAYLOAD_KIND_UDP => Payload::Udp(segment_from_wire(p)?),
                PAYLOAD_KIND_PING => Payload::Ping(p.data),
                other => return Err(MalformedFrame::UnknownPayload(other)),
            }),
        };

        Ok(Frame {
            portal_id: wire.portal_id,
            payload,
        })
    }
}

fn segment_from_wire(p: WirePayload) -> Result<Segment, MalformedFrame> {
    let src_id = match p.src_id {
        Some(id) if !id.is_empty() => SessionId::from(id),
        _ => return Err(MalformedFrame::MissingField("src_id")),
    };

    Ok(Segment {
        src_id,
        dst_addr: p.dst_addr.unwrap_or_default(),
        dst_port: p.dst_port.unwrap_or_default(),
        data: p.data,
    })
}

/// Length-delimited frame codec
///
/// Decoding yields `Ok(Err(..))` for a frame whose body is malformed and
/// `Err(..)` only for framing or transport failures.
#[derive(Debug)]
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
}

impl FrameCodec {
    /// Create a codec with the default maximum frame length
    pub fn new() -> Self {
        FrameCodec {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body =
            encode_frame(&frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.inner.encode(body, dst)
    }
}

impl Decoder for FrameCodec {
    type Item = Result<Frame, MalformedFrame>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.inner.decode(src)?.map(|body| decode_frame(&body)))
    }
}
