//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::config::BindReplyMode;
use crate::error::Socks5ReplyCode;
use crate::socks::consts::*;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encode a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Without a bound address the reply carries `0.0.0.0:0`. In
/// [`BindReplyMode::Ipv4`] an IPv6 bound address keeps its port but is
/// reported as `0.0.0.0`, so the reply is always 10 bytes.
fn encode_reply(
    reply_code: Socks5ReplyCode,
    bind_addr: Option<SocketAddr>,
    mode: BindReplyMode,
) -> Vec<u8> {
    let mut reply = Vec::with_capacity(SOCKS5_IPV4_REPLY_LEN);
    reply.extend_from_slice(&[SOCKS5_VERSION, u8::from(reply_code), SOCKS5_RESERVED]);

    match (bind_addr, mode) {
        (None, _) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV4);
            reply.extend_from_slice(&Ipv4Addr::UNSPECIFIED.octets());
            reply.extend_from_slice(&0u16.to_be_bytes());
        }
        (Some(SocketAddr::V4(addr)), _) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV4);
            reply.extend_from_slice(&addr.ip().octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
        (Some(SocketAddr::V6(addr)), BindReplyMode::Native) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV6);
            reply.extend_from_slice(&addr.ip().octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
        (Some(SocketAddr::V6(addr)), BindReplyMode::Ipv4) => {
            let ip = addr.ip().to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED);
            reply.push(SOCKS5_ADDR_TYPE_IPV4);
            reply.extend_from_slice(&ip.octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
    }

    reply
}

/// Build and send a SOCKS5 reply
async fn build_reply<S>(
    stream: &mut S,
    reply_code: Socks5ReplyCode,
    bind_addr: Option<SocketAddr>,
    mode: BindReplyMode,
) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let reply = encode_reply(reply_code, bind_addr, mode);

    stream.write_all(&reply).await?;
    stream.flush().await?;

    Ok(())
}

/// Send a success reply carrying the upstream socket's local address
pub async fn send_success<S>(
    stream: &mut S,
    bind_addr: SocketAddr,
    mode: BindReplyMode,
) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    build_reply(stream, Socks5ReplyCode::Succeeded, Some(bind_addr), mode).await
}

/// Send a 10-byte failure reply with an all-zero bound address
pub async fn send_failure<S>(stream: &mut S, reply_code: Socks5ReplyCode) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    build_reply(stream, reply_code, None, BindReplyMode::Ipv4).await
}
