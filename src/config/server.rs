//! Server configuration types
//!
//! Defines the main configuration structures for the SOCKS5 server.

use super::TcpConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address
fn default_listen_addr() -> String {
    "0.0.0.0:8081".to_string()
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// How the bound address is encoded in a successful CONNECT reply
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindReplyMode {
    /// Always a 10-byte IPv4 reply; an IPv6 local address is sent as 0.0.0.0
    #[default]
    #[serde(rename = "ipv4")]
    Ipv4,
    /// IPv6-bound upstream sockets get an ATYP 0x04 reply
    #[serde(rename = "native")]
    Native,
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the listener binds (e.g., "0.0.0.0:8081")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Encoding of the bound address in success replies
    #[serde(default)]
    pub bind_reply: BindReplyMode,

    /// Upstream connect timeout in seconds; no deadline when unset
    #[serde(default)]
    pub connect_timeout: Option<u64>,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            bind_reply: BindReplyMode::default(),
            connect_timeout: None,
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parsed listen address
    pub fn listen_socket_addr(&self) -> Result<SocketAddr, String> {
        self.listen_addr
            .parse()
            .map_err(|e| format!("Invalid listen address '{}': {}", self.listen_addr, e))
    }

    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.listen_socket_addr()?;
        if self.connect_timeout == Some(0) {
            return Err("connect_timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}
