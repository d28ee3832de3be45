//! SOCKS5 method negotiation
//!
//! Reads the client greeting and selects the "no authentication" method,
//! the only one this server offers.

use super::consts::*;
use crate::error::ProtocolError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Perform method negotiation
///
/// # SOCKS5 Greeting Format
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
///
/// A wrong version byte ends the session without a reply. When the client
/// does not offer `0x00`, `{0x05, 0xFF}` is written and
/// [`ProtocolError::NoAcceptableMethod`] returned; no further bytes are read.
/// On success exactly `{0x05, 0x00}` has been written.
pub async fn negotiate<S>(stream: &mut S) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let version = buf[0];
    let num_methods = buf[1];

    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let mut methods = vec![0u8; num_methods as usize];
    stream.read_exact(&mut methods).await?;

    let selected = select_method(&methods);

    stream.write_all(&[SOCKS5_VERSION, selected]).await?;
    stream.flush().await?;

    if selected == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        return Err(ProtocolError::NoAcceptableMethod);
    }

    debug!("Negotiated method {:#04x} from {:?}", selected, methods);
    Ok(())
}

fn select_method(methods: &[u8]) -> u8 {
    if methods.contains(&SOCKS5_AUTH_METHOD_NONE) {
        SOCKS5_AUTH_METHOD_NONE
    } else {
        SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE
    }
}
