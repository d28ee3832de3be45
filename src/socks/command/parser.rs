//! SOCKS5 request parser
//!
//! Parses the CONNECT request from the client and decodes the destination.

use crate::error::ProtocolError;
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Parse a SOCKS5 CONNECT request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Header checks run in wire order: version, reserved byte, command, then
/// address type. Only the address of a CONNECT request is read; any other
/// command fails before the address bytes are consumed.
pub async fn parse_command<S>(stream: &mut S) -> Result<TargetAddr, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    // Read: VER CMD RSV ATYP
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let cmd_byte = header[1];
    let reserved = header[2];
    let addr_type = header[3];

    if version != SOCKS5_VERSION {
        return Err(ProtocolError::InvalidRequestVersion(version));
    }

    if reserved != SOCKS5_RESERVED {
        return Err(ProtocolError::InvalidReserved(reserved));
    }

    if cmd_byte != SOCKS5_CMD_TCP_CONNECT {
        return Err(ProtocolError::CommandNotSupported(cmd_byte));
    }

    let target_addr = parse_address(stream, addr_type).await?;

    tracing::debug!("Parsed SOCKS5 CONNECT to {}", target_addr);

    Ok(target_addr)
}

/// Parse the address portion of a SOCKS5 request
async fn parse_address<S>(stream: &mut S, addr_type: u8) -> Result<TargetAddr, ProtocolError>
where
    S: AsyncRead + Unpin,
{
    match addr_type {
        SOCKS5_ADDR_TYPE_IPV4 => {
            let mut buf = [0u8; 6];
            stream.read_exact(&mut buf).await?;
            let ip = Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
            let port = u16::from_be_bytes([buf[4], buf[5]]);

            Ok(TargetAddr::from((ip, port)))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            let mut len_buf = [0u8; 1];
            stream.read_exact(&mut len_buf).await?;
            let domain_len = len_buf[0] as usize;

            if domain_len > MAX_DOMAIN_LEN {
                return Err(ProtocolError::DomainTooLong(domain_len));
            }

            // Domain followed by the port
            let mut buf = vec![0u8; domain_len + 2];
            stream.read_exact(&mut buf).await?;
            let port = u16::from_be_bytes([buf[domain_len], buf[domain_len + 1]]);
            buf.truncate(domain_len);

            let domain = String::from_utf8(buf).map_err(|e| {
                ProtocolError::InvalidDomain(String::from_utf8_lossy(e.as_bytes()).into_owned())
            })?;
            if domain.is_empty() {
                return Err(ProtocolError::InvalidDomain(domain));
            }

            Ok(TargetAddr::Domain(domain, port))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            let mut port_buf = [0u8; 2];
            stream.read_exact(&mut port_buf).await?;
            let port = u16::from_be_bytes(port_buf);

            Ok(TargetAddr::from((Ipv6Addr::from(addr), port)))
        }

        _ => Err(ProtocolError::AddressTypeNotSupported(addr_type)),
    }
}
