//! SOCKS5 module for Socksrelay
//!
//! This module implements the server side of SOCKS5 negotiation and the
//! CONNECT command, followed by a transparent TCP relay. BIND, UDP
//! ASSOCIATE and authenticated methods are not supported.

mod auth;
mod command;
mod consts;
mod handler;
mod tcp_relay;
mod types;

pub use auth::negotiate;
pub use command::{parse_command, send_failure, send_success};
pub use consts::*;
pub use handler::handle_socks5_on_stream;
pub use tcp_relay::{connect_target, relay_tcp};
pub use types::TargetAddr;
