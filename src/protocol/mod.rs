//! Protocol module for Portal Socks
//!
//! This module defines the frames exchanged with the relay and the codec
//! that carries them over the relay stream.

mod codec;
mod types;

pub use codec::{decode_frame, encode_frame, FrameCodec, MAX_FRAME_LEN};
pub use types::{
    Frame, Payload, Segment, SessionId, PAYLOAD_KIND_PING, PAYLOAD_KIND_TCP, PAYLOAD_KIND_UDP,
};
