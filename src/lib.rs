//! A client-side SOCKS4/SOCKS5 CONNECT protocol engine.
//!
//! This crate drives the client half of the SOCKS4 and SOCKS5 (RFC 1928)
//! `CONNECT` handshake over an already-established stream to a proxy. It
//! does not open that stream itself and does not listen for or accept
//! connections; callers supply any `std::io::{Read, Write}` or
//! `tokio::io::{AsyncRead, AsyncWrite}` stream, already connected to the
//! proxy, and get back the bound endpoint the proxy reports.
//!
//! Protocol byte-level encoding and decoding live in [`proto`], independent
//! of any I/O; the drivers that push those bytes over a real stream live in
//! [`io`]. [`socks4`] and [`socks5`] re-export the pairing most callers
//! want: one module per protocol version, each with blocking and async
//! entry points for both a resolved endpoint and a hostname target.

pub mod address;
pub mod auth;
pub mod error;
pub mod io;
pub mod proto;

pub use address::{AddressType, Endpoint, Target};
pub use auth::{NoAuth, Socks4Auth};
pub use error::{Condition, Error, ParseError, Socks4Reply, Socks5Reply};

/// SOCKS4 CONNECT entry points.
pub mod socks4 {
    pub use crate::io::asynch::socks4::{connect as connect_async, connect_host as connect_host_async};
    pub use crate::io::blocking::socks4::{connect, connect_host};
}

/// SOCKS5 CONNECT entry points.
pub mod socks5 {
    pub use crate::io::asynch::socks5::{connect as connect_async, connect_host as connect_host_async};
    pub use crate::io::blocking::socks5::{connect, connect_host};
}
