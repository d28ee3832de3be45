//! Main SOCKS5 handler
//!
//! This module provides the per-connection entry point. It orchestrates
//! method negotiation, request parsing, the upstream dial and the relay,
//! and turns every failure into the reply the client is owed.

use crate::config::ServerConfig;
use crate::error::ProtocolError;
use crate::socks::auth::negotiate;
use crate::socks::command::{parse_command, send_failure, send_success};
use crate::socks::tcp_relay::{connect_target, relay_tcp};
use crate::transport::Dialer;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

/// Handle SOCKS5 protocol on a client stream
///
/// # Protocol Flow
///
/// 1. Method negotiation ("no authentication" only)
/// 2. CONNECT request parsing
/// 3. Upstream dial
/// 4. Success reply and bidirectional relay
///
/// On failure the reply selected by [`ProtocolError::reply_code`] is written
/// on a best-effort basis and the error returned. The client stream and any
/// upstream stream are dropped, and therefore closed, on every path.
pub async fn handle_socks5_on_stream<S, D>(
    mut stream: S,
    dialer: &D,
    config: &ServerConfig,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer,
{
    let (upstream, bound_addr) = match establish(&mut stream, dialer, config).await {
        Ok(established) => established,
        Err(err) => {
            if let Some(code) = err.reply_code() {
                if let Err(e) = send_failure(&mut stream, code).await {
                    debug!("Failed to send {:?} reply: {}", code, e);
                }
            }
            return Err(err);
        }
    };

    send_success(&mut stream, bound_addr, config.bind_reply).await?;

    relay_tcp(stream, upstream).await;

    Ok(())
}

/// Negotiate, parse and dial; everything before the success reply
async fn establish<S, D>(
    stream: &mut S,
    dialer: &D,
    config: &ServerConfig,
) -> Result<(D::Stream, std::net::SocketAddr), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Dialer,
{
    negotiate(stream).await?;

    let target = parse_command(stream).await?;
    info!("SOCKS5 CONNECT request to {}", target);

    let (upstream, bound_addr) = connect_target(dialer, &target, config.connect_timeout()).await?;
    info!("SOCKS5 tunnel established to {} via {}", target, bound_addr);

    Ok((upstream, bound_addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socks::consts::*;
    use crate::socks::TargetAddr;
    use async_trait::async_trait;
    use std::io;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    /// Dialer that hands out in-memory streams and counts dials
    #[derive(Debug, Default)]
    struct MockDialer {
        dials: AtomicUsize,
        refuse: bool,
        bound: Option<SocketAddr>,
        peer: std::sync::Mutex<Option<DuplexStream>>,
    }

    #[async_trait]
    impl Dialer for MockDialer {
        type Stream = DuplexStream;

        fn new(_config: &ServerConfig) -> Self {
            MockDialer::default()
        }

        async fn connect(&self, _target: &TargetAddr) -> io::Result<(DuplexStream, SocketAddr)> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
            }
            let (ours, theirs) = duplex(1024);
            *self.peer.lock().unwrap() = Some(theirs);
            let bound = self
                .bound
                .unwrap_or_else(|| "10.0.0.2:40000".parse().unwrap());
            Ok((ours, bound))
        }
    }

    fn greeting() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    fn connect_ipv4(command: u8) -> Vec<u8> {
        vec![
            SOCKS5_VERSION,
            command,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
            127,
            0,
            0,
            1,
            0x1F,
            0x90,
        ]
    }

    async fn run_session(
        input: Vec<u8>,
        dialer: &MockDialer,
    ) -> (Result<(), ProtocolError>, Vec<u8>) {
        let (mut client, server) = duplex(4096);
        client.write_all(&input).await.unwrap();
        client.shutdown().await.unwrap();

        let result = handle_socks5_on_stream(server, dialer, &ServerConfig::default()).await;

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        (result, output)
    }

    #[tokio::test]
    async fn test_unsupported_command_replies_and_skips_dial() {
        let dialer = MockDialer::default();
        let mut input = greeting();
        input.extend(connect_ipv4(0x02));

        let (result, output) = run_session(input, &dialer).await;

        assert!(matches!(result, Err(ProtocolError::CommandNotSupported(2))));
        assert_eq!(
            output,
            vec![0x05, 0x00, 0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_addr_type_reply() {
        let dialer = MockDialer::default();
        let mut input = greeting();
        input.extend([SOCKS5_VERSION, SOCKS5_CMD_TCP_CONNECT, SOCKS5_RESERVED, 0x09]);

        let (result, output) = run_session(input, &dialer).await;

        assert!(matches!(result, Err(ProtocolError::AddressTypeNotSupported(9))));
        assert_eq!(&output[2..4], &[0x05, 0x08]);
        assert_eq!(output.len(), 2 + SOCKS5_IPV4_REPLY_LEN);
    }

    #[tokio::test]
    async fn test_oversized_domain_closes_without_reply() {
        let dialer = MockDialer::default();
        let mut input = greeting();
        input.extend([
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            254,
        ]);

        let (result, output) = run_session(input, &dialer).await;

        assert!(matches!(result, Err(ProtocolError::DomainTooLong(254))));
        assert_eq!(output, vec![0x05, 0x00]);
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_greeting_version_is_silent() {
        let dialer = MockDialer::default();
        let (result, output) = run_session(vec![0x04, 1, 0x00], &dialer).await;

        assert!(matches!(result, Err(ProtocolError::UnsupportedVersion(4))));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_no_acceptable_method() {
        let dialer = MockDialer::default();
        let (result, output) = run_session(vec![SOCKS5_VERSION, 1, 0x02], &dialer).await;

        assert!(matches!(result, Err(ProtocolError::NoAcceptableMethod)));
        assert_eq!(output, vec![0x05, 0xFF]);
    }

    #[tokio::test]
    async fn test_invalid_reserved_gets_general_failure() {
        let dialer = MockDialer::default();
        let mut input = greeting();
        let mut request = connect_ipv4(SOCKS5_CMD_TCP_CONNECT);
        request[2] = 0x01;
        input.extend(request);

        let (result, output) = run_session(input, &dialer).await;

        assert!(matches!(result, Err(ProtocolError::InvalidReserved(1))));
        assert_eq!(&output[2..4], &[0x05, 0x01]);
    }

    #[tokio::test]
    async fn test_dial_failure_replies_connection_refused() {
        let dialer = MockDialer {
            refuse: true,
            ..Default::default()
        };
        let mut input = greeting();
        input.extend(connect_ipv4(SOCKS5_CMD_TCP_CONNECT));

        let (result, output) = run_session(input, &dialer).await;

        assert!(matches!(result, Err(ProtocolError::ConnectFailed { .. })));
        assert_eq!(
            output,
            vec![0x05, 0x00, 0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_reply_and_relay() {
        let dialer = std::sync::Arc::new(MockDialer::default());
        let (mut client, server) = duplex(4096);

        let session_dialer = dialer.clone();
        let session = tokio::spawn(async move {
            handle_socks5_on_stream(server, session_dialer.as_ref(), &ServerConfig::default())
                .await
        });

        client.write_all(&greeting()).await.unwrap();
        client
            .write_all(&connect_ipv4(SOCKS5_CMD_TCP_CONNECT))
            .await
            .unwrap();

        let mut reply = [0u8; 12];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(
            reply,
            [0x05, 0x00, 0x05, 0x00, 0x00, 0x01, 10, 0, 0, 2, 0x9C, 0x40]
        );

        let mut upstream = dialer.peer.lock().unwrap().take().unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        upstream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        upstream.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(client);
        let result = tokio::time::timeout(Duration::from_secs(1), session)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
