//! CONNECT reply decoding for SOCKS4 and SOCKS5 (RFC 1928 section 6).

use super::{SOCKS5_REPLY_MIN_LEN, SOCKS5_REPLY_V4_LEN, SOCKS5_REPLY_V6_LEN, SOCKS5_VERSION};
use crate::address::{AddressType, Endpoint};
use crate::error::{Error, ParseError, Socks4Reply, Socks5Reply, is_failure};

/// Decodes a full 8-byte SOCKS4 CONNECT reply.
///
/// ```text
/// +----+----+----+----+----+----+----+----+
/// | VN | CD | DSTPORT |      DSTIP        |
/// +----+----+----+----+----+----+----+----+
///    1    1      2              4
/// ```
///
/// The version byte (`VN`) is not checked: some servers send `0x00` as RFC
/// SOCKS4 specifies, others echo back `0x04`; both are accepted.
///
/// Returns the bound endpoint on success ([`Socks4Reply::RequestGranted`]),
/// or the proxy's reply code as an [`Error::Socks4Reply`] otherwise. A
/// short read (fewer than 8 bytes, peer closed cleanly) is the caller's
/// responsibility to translate from the underlying I/O error; this
/// function assumes a full 8-byte buffer.
pub fn decode_v4_reply(buf: &[u8; 8]) -> Result<Endpoint, Error> {
    let status = buf[1];
    let port = u16::from_be_bytes([buf[2], buf[3]]);
    let octets = [buf[4], buf[5], buf[6], buf[7]];
    let endpoint = Endpoint::from_v4_octets(octets, port);

    if is_failure(status) {
        return Err(Error::Socks4Reply(Socks4Reply::from(status)));
    }
    Ok(endpoint)
}

/// Decodes the 2-byte SOCKS5 method-selection reply, returning the method
/// byte the server selected.
pub fn decode_v5_method_selection(buf: &[u8; 2]) -> Result<u8, Error> {
    if buf[0] != SOCKS5_VERSION {
        return Err(Error::Parse(ParseError::BadRequestVersion(buf[0])));
    }
    Ok(buf[1])
}

/// Decodes a SOCKS5 CONNECT reply.
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Applies the decoding rules in order: a too-short buffer fails before the
/// version is even examined; a bad version fails before the status byte is
/// examined; a non-success status returns immediately with no endpoint; a
/// short-but-plausible success reply (`n < 10`) returns `Ok(None)` rather
/// than failing, since proxies commonly zero-fill and truncate it; only
/// then is the address type dispatched on.
pub fn decode_v5_reply(buf: &[u8]) -> Result<Option<Endpoint>, Error> {
    if buf.len() < SOCKS5_REPLY_MIN_LEN {
        return Err(Error::Parse(ParseError::ShortReply));
    }
    if buf[0] != SOCKS5_VERSION {
        return Err(Error::Parse(ParseError::BadRequestVersion(buf[0])));
    }

    let status = buf[1];
    if is_failure(status) {
        return Err(Error::Socks5Reply(Socks5Reply::from(status)));
    }

    if buf.len() < SOCKS5_REPLY_V4_LEN {
        return Ok(None);
    }

    match AddressType::from(buf[3]) {
        AddressType::V4 => {
            let octets = [buf[4], buf[5], buf[6], buf[7]];
            let port = u16::from_be_bytes([buf[8], buf[9]]);
            Ok(Some(Endpoint::from_v4_octets(octets, port)))
        }
        AddressType::V6 => {
            if buf.len() < SOCKS5_REPLY_V6_LEN {
                return Err(Error::Parse(ParseError::ShortReply));
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[4..20]);
            let port = u16::from_be_bytes([buf[20], buf[21]]);
            Ok(Some(Endpoint::from_v6_octets(octets, port)))
        }
        AddressType::DomainName | AddressType::Unknown(_) => {
            Err(Error::Parse(ParseError::BadAddressType(buf[3])))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v5_success_ipv4_scenario() {
        let bytes = [
            0x05, 0x00, 0x00, 0x01, 0xC0, 0xA8, 0x01, 0x01, 0x1F, 0x90,
        ];
        let endpoint = decode_v5_reply(&bytes).unwrap().unwrap();
        assert_eq!(endpoint.to_string(), "192.168.1.1:8080");
    }

    #[test]
    fn v5_host_unreachable_scenario() {
        let bytes = [0x05, 0x04, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        let err = decode_v5_reply(&bytes).unwrap_err();
        assert!(matches!(err, Error::Socks5Reply(Socks5Reply::HostUnreachable)));
        assert_eq!(err.condition(), crate::error::Condition::ReplyError);
    }

    #[test]
    fn v5_truncated_success_has_no_endpoint() {
        let bytes = [0x05, 0x00];
        assert_eq!(decode_v5_reply(&bytes).unwrap(), None);
    }

    #[test]
    fn v5_empty_and_single_byte_replies_are_short() {
        assert!(matches!(
            decode_v5_reply(&[]).unwrap_err(),
            Error::Parse(ParseError::ShortReply)
        ));
        assert!(matches!(
            decode_v5_reply(&[0x05]).unwrap_err(),
            Error::Parse(ParseError::ShortReply)
        ));
    }

    #[test]
    fn v5_bad_version_fails_before_status_is_consulted() {
        // A bad version alongside what would otherwise be a failure status
        // still surfaces the version error, not the status.
        let bytes = [0x04, 0x04, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_v5_reply(&bytes).unwrap_err(),
            Error::Parse(ParseError::BadRequestVersion(0x04))
        ));
    }

    #[test]
    fn v5_unknown_atyp_after_success_is_general_failure_equivalent() {
        let bytes = [0x05, 0x00, 0x00, 0x7F, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_v5_reply(&bytes).unwrap_err(),
            Error::Parse(ParseError::BadAddressType(0x7F))
        ));
    }

    #[test]
    fn v5_decode_is_idempotent() {
        let bytes = [
            0x05, 0x00, 0x00, 0x01, 0xC0, 0xA8, 0x01, 0x01, 0x1F, 0x90,
        ];
        assert_eq!(decode_v5_reply(&bytes).unwrap(), decode_v5_reply(&bytes).unwrap());
    }

    #[test]
    fn v4_success_scenario() {
        let bytes = [0x00, 0x5A, 0x1F, 0x90, 0xC0, 0xA8, 0x01, 0x01];
        let endpoint = decode_v4_reply(&bytes).unwrap();
        assert_eq!(endpoint.to_string(), "192.168.1.1:8080");
    }

    #[test]
    fn v4_rejected_scenario() {
        let bytes = [0x00, 0x5B, 0, 0, 0, 0, 0, 0];
        let err = decode_v4_reply(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Socks4Reply(Socks4Reply::RequestRejectedOrFailed)
        ));
        assert_eq!(err.condition(), crate::error::Condition::ReplyError);
    }

    #[test]
    fn v4_tolerates_either_version_echo() {
        let echoed_04 = [0x04, 0x5A, 0, 80, 10, 0, 0, 1];
        let echoed_00 = [0x00, 0x5A, 0, 80, 10, 0, 0, 1];
        assert_eq!(decode_v4_reply(&echoed_04).unwrap(), decode_v4_reply(&echoed_00).unwrap());
    }
}
