//! CONNECT request encoding for SOCKS4 and SOCKS5 (RFC 1928 section 4).

use super::{CMD_CONNECT, METHOD_NO_AUTH, SOCKS4_VERSION, SOCKS5_VERSION};
use crate::address::{AddressType, Endpoint, Target};
use crate::error::Error;

/// Encodes a SOCKS4 CONNECT request.
///
/// ```text
/// +----+----+----+----+----+----+----+----+----+----+....+----+
/// | VN | CD | DSTPORT |      DSTIP        | USERID       |NULL|
/// +----+----+----+----+----+----+----+----+----+----+....+----+
///    1    1      2              4           variable       1
/// ```
///
/// Fails with [`Error::Socks4RequiresIpv4`] if `target` is an IPv6
/// endpoint; SOCKS4 has no wire representation for one.
pub fn encode_v4_connect(target: &Endpoint, user_id: &str) -> Result<Vec<u8>, Error> {
    let addr = match target {
        Endpoint::V4(addr) => addr,
        Endpoint::V6(_) => return Err(Error::Socks4RequiresIpv4),
    };

    let mut buf = Vec::with_capacity(9 + user_id.len());
    buf.push(SOCKS4_VERSION);
    buf.push(CMD_CONNECT);
    buf.extend_from_slice(&addr.port().to_be_bytes());
    buf.extend_from_slice(&addr.ip().octets());
    buf.extend_from_slice(user_id.as_bytes());
    buf.push(0x00);
    Ok(buf)
}

/// Encodes the 3-byte SOCKS5 method-negotiation greeting offering only
/// "no authentication required".
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     |    1     |
/// +----+----------+----------+
/// ```
pub fn encode_v5_greeting() -> [u8; 3] {
    [SOCKS5_VERSION, 1, METHOD_NO_AUTH]
}

/// Encodes a SOCKS5 CONNECT request for an already-resolved or
/// not-yet-resolved target.
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Fails with [`Error::DomainNameTooLong`] if `target` is a hostname
/// longer than 255 bytes (the length prefix is a single byte).
pub fn encode_v5_connect(target: &Target) -> Result<Vec<u8>, Error> {
    let mut buf = vec![SOCKS5_VERSION, CMD_CONNECT, 0x00];

    match target {
        Target::Endpoint(Endpoint::V4(addr)) => {
            buf.push(AddressType::V4.to_u8());
            buf.extend_from_slice(&addr.ip().octets());
            buf.extend_from_slice(&addr.port().to_be_bytes());
        }
        Target::Endpoint(Endpoint::V6(addr)) => {
            buf.push(AddressType::V6.to_u8());
            buf.extend_from_slice(&addr.ip().octets());
            buf.extend_from_slice(&addr.port().to_be_bytes());
        }
        Target::Hostname(host, port) => {
            if host.len() > u8::MAX as usize {
                return Err(Error::DomainNameTooLong(host.clone()));
            }
            buf.push(AddressType::DomainName.to_u8());
            buf.push(host.len() as u8);
            buf.extend_from_slice(host.as_bytes());
            buf.extend_from_slice(&port.to_be_bytes());
        }
    }

    Ok(buf)
}
