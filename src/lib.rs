//! # Socksrelay - SOCKS5 CONNECT Proxy
//!
//! Socksrelay is a small SOCKS5 server. It negotiates the "no
//! authentication" method, accepts CONNECT requests for IPv4, IPv6 and
//! domain-name destinations, dials the destination over TCP and relays
//! bytes transparently until either side closes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksrelay::config::load_config;
//! use socksrelay::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("socksrelay.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(config, shutdown_rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Each accepted connection runs in its own task:
//!
//! ```text
//! negotiate -> parse CONNECT -> dial upstream -> reply -> relay
//! ```
//!
//! Sessions share no mutable state. Every protocol failure is a
//! [`ProtocolError`] that the session handler answers (or not) before
//! closing the connection.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{ProtocolError, RelayError, Socks5ReplyCode};
pub use server::{run_server, Server};

/// Version of the Socksrelay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
