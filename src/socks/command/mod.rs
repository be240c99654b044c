//! SOCKS5 command parsing module
//!
//! Handles parsing SOCKS5 requests and building replies.

mod parser;
mod reply;

pub use parser::{parse_request, SocksRequest};
pub use reply::{reply_bytes, send_reply};
