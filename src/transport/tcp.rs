//! TCP dialer implementation
//!
//! Opens plain TCP connections to CONNECT destinations.

use super::{Dialer, SocketOpts};
use crate::config::ServerConfig;
use crate::socks::TargetAddr;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Plain TCP dialer
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    fn new(config: &ServerConfig) -> Self {
        TcpDialer {
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
        }
    }

    async fn connect(&self, target: &TargetAddr) -> io::Result<(TcpStream, SocketAddr)> {
        // Domain names are resolved here, every resolved address is tried
        let stream = match target {
            TargetAddr::Ip(addr) => TcpStream::connect(*addr).await?,
            TargetAddr::Domain(domain, port) => TcpStream::connect((domain.as_str(), *port)).await?,
        };

        self.socket_opts.hint(&stream);
        let local_addr = stream.local_addr()?;

        tracing::debug!("TCP connection established to {} from {}", target, local_addr);

        Ok((stream, local_addr))
    }
}
