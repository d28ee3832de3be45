//! CONNECT destination

use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Destination decoded from a CONNECT request
///
/// Domain names stay unresolved; the dialer looks them up when it
/// connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IPv4 or IPv6 literal
    Ip(SocketAddr),
    /// Domain name and port
    Domain(String, u16),
}

/// Formats as a dial string: `a.b.c.d:port`, `[v6]:port` or `domain:port`.
impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

impl<I: Into<IpAddr>> From<(I, u16)> for TargetAddr {
    fn from((ip, port): (I, u16)) -> Self {
        TargetAddr::Ip(SocketAddr::new(ip.into(), port))
    }
}
