//! Error and condition model for the SOCKS CONNECT engine.
//!
//! The protocol exposes two layered categories of failure: a fine-grained
//! [`Error`] (which embeds the exact numeric reply code or parse failure),
//! and a coarse [`Condition`] that every [`Error`] maps to via
//! [`Error::condition`]. Callers that only care whether the handshake
//! succeeded, was rejected by the proxy, or was malformed can match on
//! [`Condition`] without enumerating every numeric code.

use std::fmt;
use thiserror::Error;

/// A SOCKS4 CONNECT reply code (RFC SOCKS4, `VN`/`CD` byte).
///
/// Values `0x5A`-`0x5D` are the ones a proxy is expected to send; any other
/// byte normalises to [`Socks4Reply::Unassigned`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Socks4Reply {
    /// 0x5A - request granted.
    RequestGranted,
    /// 0x5B - request rejected or failed.
    RequestRejectedOrFailed,
    /// 0x5C - request rejected: the SOCKS server cannot connect to identd
    /// on the client.
    CannotConnectToIdentdOnTheClient,
    /// 0x5D - request rejected: the client program and identd report
    /// different user-ids.
    ClientAndIdentdReportDifferentUserIds,
    /// Any byte outside the four codes above.
    Unassigned,
}

impl Socks4Reply {
    /// The raw numeric reply code, as it would appear on the wire.
    ///
    /// [`Socks4Reply::Unassigned`] has no canonical wire value; `0xFF` is
    /// used as the conventional sentinel.
    pub fn to_u8(self) -> u8 {
        match self {
            Socks4Reply::RequestGranted => 0x5A,
            Socks4Reply::RequestRejectedOrFailed => 0x5B,
            Socks4Reply::CannotConnectToIdentdOnTheClient => 0x5C,
            Socks4Reply::ClientAndIdentdReportDifferentUserIds => 0x5D,
            Socks4Reply::Unassigned => 0xFF,
        }
    }
}

impl From<u8> for Socks4Reply {
    fn from(byte: u8) -> Self {
        match byte {
            0x5A => Socks4Reply::RequestGranted,
            0x5B => Socks4Reply::RequestRejectedOrFailed,
            0x5C => Socks4Reply::CannotConnectToIdentdOnTheClient,
            0x5D => Socks4Reply::ClientAndIdentdReportDifferentUserIds,
            _ => Socks4Reply::Unassigned,
        }
    }
}

impl fmt::Display for Socks4Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Socks4Reply::RequestGranted => "Request granted",
            Socks4Reply::RequestRejectedOrFailed => "Request rejected or failed",
            Socks4Reply::CannotConnectToIdentdOnTheClient => {
                "Request rejected: cannot connect to identd on the client"
            }
            Socks4Reply::ClientAndIdentdReportDifferentUserIds => {
                "Request rejected: client and identd report different user-ids"
            }
            Socks4Reply::Unassigned => "Unassigned",
        };
        f.write_str(msg)
    }
}

/// A SOCKS5 CONNECT reply code (RFC 1928 section 6, `REP` byte).
///
/// Values `0x00`-`0x08` are the ones defined by RFC 1928; any other byte,
/// including `0x09` and `0xFF`, normalises to [`Socks5Reply::Unassigned`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Socks5Reply {
    /// 0x00 - succeeded.
    Succeeded,
    /// 0x01 - general SOCKS server failure.
    GeneralFailure,
    /// 0x02 - connection not allowed by ruleset.
    ConnectionNotAllowedByRuleset,
    /// 0x03 - network unreachable.
    NetworkUnreachable,
    /// 0x04 - host unreachable.
    HostUnreachable,
    /// 0x05 - connection refused.
    ConnectionRefused,
    /// 0x06 - TTL expired.
    TtlExpired,
    /// 0x07 - command not supported.
    CommandNotSupported,
    /// 0x08 - address type not supported.
    AddressTypeNotSupported,
    /// Any byte outside `0x00..=0x08`.
    Unassigned,
}

impl Socks5Reply {
    /// The raw numeric reply code, as it would appear on the wire.
    ///
    /// [`Socks5Reply::Unassigned`] has no canonical wire value; `0xFF` is
    /// used as the conventional sentinel.
    pub fn to_u8(self) -> u8 {
        match self {
            Socks5Reply::Succeeded => 0x00,
            Socks5Reply::GeneralFailure => 0x01,
            Socks5Reply::ConnectionNotAllowedByRuleset => 0x02,
            Socks5Reply::NetworkUnreachable => 0x03,
            Socks5Reply::HostUnreachable => 0x04,
            Socks5Reply::ConnectionRefused => 0x05,
            Socks5Reply::TtlExpired => 0x06,
            Socks5Reply::CommandNotSupported => 0x07,
            Socks5Reply::AddressTypeNotSupported => 0x08,
            Socks5Reply::Unassigned => 0xFF,
        }
    }
}

impl From<u8> for Socks5Reply {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Socks5Reply::Succeeded,
            0x01 => Socks5Reply::GeneralFailure,
            0x02 => Socks5Reply::ConnectionNotAllowedByRuleset,
            0x03 => Socks5Reply::NetworkUnreachable,
            0x04 => Socks5Reply::HostUnreachable,
            0x05 => Socks5Reply::ConnectionRefused,
            0x06 => Socks5Reply::TtlExpired,
            0x07 => Socks5Reply::CommandNotSupported,
            0x08 => Socks5Reply::AddressTypeNotSupported,
            _ => Socks5Reply::Unassigned,
        }
    }
}

impl fmt::Display for Socks5Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Socks5Reply::Succeeded => "Succeeded",
            Socks5Reply::GeneralFailure => "General SOCKS server failure",
            Socks5Reply::ConnectionNotAllowedByRuleset => "Connection not allowed by ruleset",
            Socks5Reply::NetworkUnreachable => "Network unreachable",
            Socks5Reply::HostUnreachable => "Host unreachable",
            Socks5Reply::ConnectionRefused => "Connection refused",
            Socks5Reply::TtlExpired => "TTL expired",
            Socks5Reply::CommandNotSupported => "Command not supported",
            Socks5Reply::AddressTypeNotSupported => "Address type not supported",
            Socks5Reply::Unassigned => "Unassigned",
        };
        f.write_str(msg)
    }
}

/// Returns `true` iff a raw reply byte denotes failure.
///
/// The only two numeric success codes across both protocol versions are
/// `0` (SOCKS5 `succeeded`) and `90` (SOCKS4 `request_granted`); every other
/// byte is a failure, whether or not it is a recognised reply code.
pub fn is_failure(code: u8) -> bool {
    code != 0 && code != 90
}

/// A malformed-reply condition detected while parsing, as opposed to a
/// numeric status the proxy itself reported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The reply was shorter than the minimum size for its version.
    #[error("reply too short to contain a status byte")]
    ShortReply,
    /// The version byte in the reply did not match the expected protocol
    /// version.
    #[error("unexpected version byte {0:#04x} in reply")]
    BadRequestVersion(u8),
    /// A reserved byte that must be `0x00` carried another value.
    #[error("reserved byte {0:#04x} was not zero")]
    BadReservedComponent(u8),
    /// The address-type byte did not name a recognised address family.
    #[error("unrecognised address type {0:#04x}")]
    BadAddressType(u8),
}

/// The coarse outcome category every [`Error`] maps to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// The handshake completed and a bound endpoint is available.
    Succeeded,
    /// The proxy returned a non-success numeric reply code.
    ReplyError,
    /// A framing/policy failure was detected before any reply payload
    /// (e.g. method negotiation failed, or the transport itself failed).
    ProxyError,
    /// The reply bytes could not be parsed at all.
    ParseError,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Condition::Succeeded => "succeeded",
            Condition::ReplyError => "reply error",
            Condition::ProxyError => "proxy error",
            Condition::ParseError => "parse error",
        };
        f.write_str(msg)
    }
}

/// The unified error type returned by every connect entry point.
#[derive(Debug, Error)]
pub enum Error {
    /// A SOCKS4 proxy reported a non-success reply code.
    #[error("SOCKS4 proxy replied: {0}")]
    Socks4Reply(Socks4Reply),
    /// A SOCKS5 proxy reported a non-success reply code.
    #[error("SOCKS5 proxy replied: {0}")]
    Socks5Reply(Socks5Reply),
    /// The reply bytes did not parse.
    #[error("malformed SOCKS reply: {0}")]
    Parse(#[from] ParseError),
    /// The server selected an authentication method other than
    /// "no authentication" during SOCKS5 method negotiation.
    #[error("SOCKS5 proxy selected unacceptable method {0:#04x}")]
    MethodNotAccepted(u8),
    /// A SOCKS4-with-hostname target resolved only to IPv6 endpoints, or
    /// every resolved IPv4 endpoint failed to connect.
    #[error("no usable IPv4 endpoint found for host")]
    HostNotFound,
    /// A SOCKS4 request was asked to address an IPv6 endpoint directly.
    /// SOCKS4 has no IPv6 address type; callers with an IPv6-only target
    /// must use SOCKS5.
    #[error("SOCKS4 cannot address an IPv6 endpoint directly")]
    Socks4RequiresIpv4,
    /// A SOCKS5 domain name exceeded the 255-byte length-prefixed limit.
    #[error("domain name {0:?} is longer than 255 bytes")]
    DomainNameTooLong(String),
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An async connect was cancelled via its `CancellationToken` before
    /// the handshake completed.
    #[error("connect cancelled")]
    Cancelled,
}

impl Error {
    /// Maps this error onto its coarse [`Condition`].
    pub fn condition(&self) -> Condition {
        match self {
            Error::Socks4Reply(code) => {
                if is_failure(code.to_u8()) {
                    Condition::ReplyError
                } else {
                    Condition::Succeeded
                }
            }
            Error::Socks5Reply(code) => {
                if is_failure(code.to_u8()) {
                    Condition::ReplyError
                } else {
                    Condition::Succeeded
                }
            }
            Error::Parse(_) => Condition::ParseError,
            Error::MethodNotAccepted(_) => Condition::ProxyError,
            Error::HostNotFound => Condition::ProxyError,
            Error::Socks4RequiresIpv4 => Condition::ProxyError,
            Error::DomainNameTooLong(_) => Condition::ProxyError,
            Error::Io(_) => Condition::ProxyError,
            Error::Cancelled => Condition::ProxyError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_failure_matches_success_sentinels() {
        for code in 0u8..=255 {
            let expect_failure = code != 0 && code != 90;
            assert_eq!(is_failure(code), expect_failure, "code={code}");
        }
    }

    #[test]
    fn socks5_reply_round_trips_named_codes() {
        for i in 0u8..=8 {
            let code = Socks5Reply::from(i);
            assert_eq!(code.to_u8(), i);
            assert_ne!(code.to_string(), "Unassigned");
        }
    }

    #[test]
    fn socks5_unknown_codes_normalise_to_unassigned() {
        assert_eq!(Socks5Reply::from(9), Socks5Reply::Unassigned);
        assert_eq!(Socks5Reply::from(0xFF), Socks5Reply::Unassigned);
        assert_eq!(Socks5Reply::Unassigned.to_string(), "Unassigned");
    }

    #[test]
    fn socks4_reply_round_trips_named_codes() {
        for i in [0x5Au8, 0x5B, 0x5C, 0x5D] {
            let code = Socks4Reply::from(i);
            assert_eq!(code.to_u8(), i);
            assert_ne!(code.to_string(), "Unassigned");
        }
        assert_eq!(Socks4Reply::from(0x00), Socks4Reply::Unassigned);
    }

    #[test]
    fn socks4_and_socks5_messages_are_distinct() {
        // The reference implementation copy-pasted SOCKS5 strings onto
        // SOCKS4 codes; this implementation keeps them independent.
        assert_ne!(
            Socks4Reply::CannotConnectToIdentdOnTheClient.to_string(),
            Socks5Reply::ConnectionNotAllowedByRuleset.to_string()
        );
    }

    #[test]
    fn condition_mapping_is_total_and_distinguishes_categories() {
        let reply_err = Error::Socks5Reply(Socks5Reply::HostUnreachable).condition();
        let parse_err = Error::Parse(ParseError::ShortReply).condition();
        let proxy_err = Error::MethodNotAccepted(0x02).condition();

        assert_eq!(reply_err, Condition::ReplyError);
        assert_eq!(parse_err, Condition::ParseError);
        assert_eq!(proxy_err, Condition::ProxyError);
        assert_ne!(reply_err, parse_err);
        assert_ne!(parse_err, proxy_err);
    }

    #[test]
    fn success_reply_codes_map_to_succeeded_condition() {
        assert_eq!(
            Error::Socks4Reply(Socks4Reply::RequestGranted).condition(),
            Condition::Succeeded
        );
        assert_eq!(
            Error::Socks5Reply(Socks5Reply::Succeeded).condition(),
            Condition::Succeeded
        );
    }
}
