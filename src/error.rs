//! Error types for Socksrelay
//!
//! This module defines the process-level error type, the per-session
//! protocol error, and the SOCKS5 reply codes those errors map onto.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Main error type for Socksrelay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },
}

/// Errors that terminate a single SOCKS5 session.
///
/// None of these escape the session task. The handler asks
/// [`ProtocolError::reply_code`] whether a reply is owed to the client,
/// writes it, and drops both connections.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Greeting carried a version other than 5
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Client offered no method we accept
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Request header carried a version other than 5
    #[error("Invalid request version: {0}")]
    InvalidRequestVersion(u8),

    /// Request header reserved byte was not zero
    #[error("Invalid reserved byte: {0:#04x}")]
    InvalidReserved(u8),

    /// Command other than CONNECT
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Unknown address type byte
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Domain length byte above the accepted maximum
    #[error("Domain name too long: {0} bytes")]
    DomainTooLong(usize),

    /// Domain was empty or not valid UTF-8
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),

    /// Outbound connection to the destination failed
    #[error("Failed to connect to {target}: {source}")]
    ConnectFailed {
        /// Destination as requested by the client
        target: String,
        /// Underlying dial error
        #[source]
        source: io::Error,
    },

    /// Outbound connection did not complete in time
    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),

    /// Read or write on the client connection failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Reply the session owes the client before closing, if any.
    pub fn reply_code(&self) -> Option<Socks5ReplyCode> {
        match self {
            ProtocolError::InvalidRequestVersion(_) | ProtocolError::InvalidReserved(_) => {
                Some(Socks5ReplyCode::GeneralFailure)
            }
            ProtocolError::CommandNotSupported(_) => Some(Socks5ReplyCode::CommandNotSupported),
            ProtocolError::AddressTypeNotSupported(_) | ProtocolError::InvalidDomain(_) => {
                Some(Socks5ReplyCode::AddressTypeNotSupported)
            }
            ProtocolError::ConnectFailed { .. } | ProtocolError::ConnectTimeout(_) => {
                Some(Socks5ReplyCode::ConnectionRefused)
            }
            // The 0xFF method selection was already sent during negotiation.
            ProtocolError::NoAcceptableMethod => None,
            ProtocolError::UnsupportedVersion(_)
            | ProtocolError::DomainTooLong(_)
            | ProtocolError::Io(_) => None,
        }
    }

    /// True when the peer simply went away mid-message.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(e) if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::BrokenPipe
            )
        )
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}
