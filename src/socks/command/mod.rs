//! SOCKS5 request handling
//!
//! Parses the CONNECT request and builds replies.

mod parser;
mod reply;

pub use parser::parse_command;
pub use reply::{send_failure, send_success};
