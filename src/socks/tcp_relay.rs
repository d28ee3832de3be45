//! TCP relay for SOCKS5 CONNECT command
//!
//! Dials the destination and relays data bidirectionally between the
//! client and the upstream connection.

use crate::error::ProtocolError;
use crate::socks::types::TargetAddr;
use crate::transport::Dialer;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Open the upstream connection for a CONNECT request
///
/// Returns the stream and the local address it bound to. Any failure,
/// including an expired `timeout`, is reported as a dial error so the
/// session answers with "connection refused".
pub async fn connect_target<D: Dialer>(
    dialer: &D,
    target: &TargetAddr,
    timeout: Option<Duration>,
) -> Result<(D::Stream, SocketAddr), ProtocolError> {
    debug!("Connecting to target: {}", target);

    let result = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, dialer.connect(target))
            .await
            .map_err(|_| ProtocolError::ConnectTimeout(target.to_string()))?,
        None => dialer.connect(target).await,
    };

    result.map_err(|source| ProtocolError::ConnectFailed {
        target: target.to_string(),
        source,
    })
}

/// Relay data bidirectionally between the client and the upstream
///
/// Client-to-upstream copying runs on a spawned task, upstream-to-client
/// copying runs inline. Whichever direction reaches EOF or an error first
/// ends the relay: the other direction is cancelled and every half is
/// dropped, which closes both connections.
pub async fn relay_tcp<A, B>(client: A, upstream: B)
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    let mut to_upstream =
        tokio::spawn(async move { tokio::io::copy(&mut client_read, &mut upstream_write).await });
    let to_client = tokio::io::copy(&mut upstream_read, &mut client_write);

    let finished = tokio::select! {
        result = &mut to_upstream => Direction::ToUpstream(flatten(result)),
        result = to_client => Direction::ToClient(result),
    };

    match finished {
        Direction::ToUpstream(result) => match result {
            Ok(bytes) => debug!("client->upstream finished: {} bytes", bytes),
            Err(e) => debug!("client->upstream error: {}", e),
        },
        Direction::ToClient(result) => {
            match result {
                Ok(bytes) => debug!("upstream->client finished: {} bytes", bytes),
                Err(e) => debug!("upstream->client error: {}", e),
            }
            // Dropping the task's halves is what closes the sockets
            to_upstream.abort();
            let _ = to_upstream.await;
        }
    }
}

enum Direction {
    ToUpstream(io::Result<u64>),
    ToClient(io::Result<u64>),
}

fn flatten(result: Result<io::Result<u64>, tokio::task::JoinError>) -> io::Result<u64> {
    result.unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)))
}
