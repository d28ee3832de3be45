//! SOCKS5 listener
//!
//! Accepts client connections and runs one session task per connection.

use crate::config::{Config, ServerConfig};
use crate::error::RelayError;
use crate::socks::handle_socks5_on_stream;
use crate::transport::{Dialer, SocketOpts, TcpDialer};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

/// Pause after a failed accept, so fd exhaustion does not spin the loop
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(50);

/// Run the server with the given configuration until shutdown
pub async fn run_server(
    config: Config,
    shutdown_rx: broadcast::Receiver<bool>,
) -> Result<(), RelayError> {
    let server = Server::<TcpDialer>::bind(config.server).await?;
    server.run(shutdown_rx).await
}

/// Bound SOCKS5 listener
pub struct Server<D: Dialer> {
    /// Listening socket
    listener: TcpListener,
    /// Server configuration, shared with every session
    config: Arc<ServerConfig>,
    /// Upstream dialer, shared with every session
    dialer: Arc<D>,
    /// Options applied to accepted sockets
    socket_opts: SocketOpts,
}

impl<D: Dialer> Server<D> {
    /// Bind the listener, creating the dialer from configuration
    pub async fn bind(config: ServerConfig) -> Result<Self, RelayError> {
        let dialer = D::new(&config);
        Self::bind_with_dialer(config, dialer).await
    }

    /// Bind the listener with an explicit dialer
    pub async fn bind_with_dialer(config: ServerConfig, dialer: D) -> Result<Self, RelayError> {
        config.validate().map_err(RelayError::Config)?;
        let addr = config.listen_socket_addr().map_err(RelayError::Config)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;

        info!("SOCKS5 server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            config: Arc::new(config),
            dialer: Arc::new(dialer),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until a shutdown signal arrives
    ///
    /// Sessions already running are not interrupted by shutdown.
    pub async fn run(self, shutdown_rx: broadcast::Receiver<bool>) -> Result<(), RelayError> {
        accept_loop(&self.listener, shutdown_rx, |stream, peer| {
            self.spawn_session(stream, peer)
        })
        .await;

        info!("Server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        debug!("Accepted connection from {}", peer);
        self.socket_opts.hint(&stream);

        let dialer = Arc::clone(&self.dialer);
        let config = Arc::clone(&self.config);

        tokio::spawn(
            async move {
                match handle_socks5_on_stream(stream, dialer.as_ref(), &config).await {
                    Ok(()) => debug!("Session closed"),
                    Err(e) if e.is_disconnect() => debug!("Client disconnected: {}", e),
                    Err(e) => warn!("Session ended: {}", e),
                }
            }
            .instrument(info_span!("session", %peer)),
        );
    }
}

/// Source of inbound connections
#[async_trait]
trait Accept: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Hand each accepted connection to `on_accept` until shutdown.
///
/// Accept failures are logged and the loop continues after a short pause.
async fn accept_loop<A, F>(
    acceptor: &A,
    mut shutdown_rx: broadcast::Receiver<bool>,
    mut on_accept: F,
) where
    A: Accept,
    F: FnMut(TcpStream, SocketAddr) + Send,
{
    loop {
        tokio::select! {
            accepted = acceptor.accept() => {
                match accepted {
                    Ok((stream, peer)) => on_accept(stream, peer),
                    Err(e) => {
                        warn!("Accept error: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping listener");
                break;
            }
        }
    }
}
