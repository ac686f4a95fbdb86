//! Address-family model shared by the SOCKS4 and SOCKS5 request/reply
//! codecs.
//!
//! The wire protocol represents an address as a tagged union over
//! `{ip_v4, domain_name, ip_v6}`. [`AddressType`] models the tag byte;
//! [`Endpoint`] models a resolved `(address, port)` pair; [`Target`] is
//! what a caller hands to a connect entry point, before or after local
//! resolution.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// The `ATYP` tag byte of a SOCKS5 request or reply.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// `0x01` - IPv4 address.
    V4,
    /// `0x03` - domain name.
    DomainName,
    /// `0x04` - IPv6 address.
    V6,
    /// Any byte not named above.
    Unknown(u8),
}

impl AddressType {
    /// The wire byte for this tag.
    pub fn to_u8(self) -> u8 {
        match self {
            AddressType::V4 => 0x01,
            AddressType::DomainName => 0x03,
            AddressType::V6 => 0x04,
            AddressType::Unknown(b) => b,
        }
    }
}

impl From<u8> for AddressType {
    fn from(byte: u8) -> Self {
        match byte {
            0x01 => AddressType::V4,
            0x03 => AddressType::DomainName,
            0x04 => AddressType::V6,
            other => AddressType::Unknown(other),
        }
    }
}

/// A resolved `(address, port)` pair, as carried in a SOCKS4/SOCKS5 reply's
/// bound-address fields or a caller-supplied connect target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// An IPv4 endpoint.
    V4(SocketAddrV4),
    /// An IPv6 endpoint.
    V6(SocketAddrV6),
}

impl Endpoint {
    /// Builds an IPv4 endpoint from 4 raw big-endian octets and a port.
    pub fn from_v4_octets(octets: [u8; 4], port: u16) -> Self {
        Endpoint::V4(SocketAddrV4::new(Ipv4Addr::from(octets), port))
    }

    /// Builds an IPv6 endpoint from 16 raw octets (copied verbatim) and a
    /// port.
    pub fn from_v6_octets(octets: [u8; 16], port: u16) -> Self {
        Endpoint::V6(SocketAddrV6::new(Ipv6Addr::from(octets), port, 0, 0))
    }

    /// The address-type tag this endpoint would carry on the wire.
    pub fn address_type(&self) -> AddressType {
        match self {
            Endpoint::V4(_) => AddressType::V4,
            Endpoint::V6(_) => AddressType::V6,
        }
    }

    /// The port, independent of address family.
    pub fn port(&self) -> u16 {
        match self {
            Endpoint::V4(addr) => addr.port(),
            Endpoint::V6(addr) => addr.port(),
        }
    }

    /// The address bytes and big-endian port pair as they are emitted on
    /// the wire (4 or 16 address bytes, followed by 2 port bytes).
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(18);
        match self {
            Endpoint::V4(addr) => buf.extend_from_slice(&addr.ip().octets()),
            Endpoint::V6(addr) => buf.extend_from_slice(&addr.ip().octets()),
        }
        buf.extend_from_slice(&self.port().to_be_bytes());
        buf
    }

    /// `true` if this endpoint is an IPv6 endpoint.
    pub fn is_v6(&self) -> bool {
        matches!(self, Endpoint::V6(_))
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Endpoint::V4(v4),
            SocketAddr::V6(v6) => Endpoint::V6(v6),
        }
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(ep: Endpoint) -> Self {
        match ep {
            Endpoint::V4(addr) => SocketAddr::V4(addr),
            Endpoint::V6(addr) => SocketAddr::V6(addr),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::V4(addr) => write!(f, "{addr}"),
            Endpoint::V6(addr) => write!(f, "{addr}"),
        }
    }
}

/// The target a caller wants the proxy to CONNECT to: either already
/// resolved, or a hostname the proxy (SOCKS5) or the local resolver
/// (SOCKS4) must turn into an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A pre-resolved endpoint.
    Endpoint(Endpoint),
    /// An unresolved hostname and port.
    Hostname(String, u16),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Endpoint(ep) => write!(f, "{ep}"),
            Target::Hostname(host, port) => write!(f, "{host}:{port}"),
        }
    }
}

impl From<Endpoint> for Target {
    fn from(ep: Endpoint) -> Self {
        Target::Endpoint(ep)
    }
}

impl From<SocketAddr> for Target {
    fn from(addr: SocketAddr) -> Self {
        Target::Endpoint(Endpoint::from(addr))
    }
}
