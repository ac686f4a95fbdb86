//! Authentication parameter types accepted by the connect drivers.
//!
//! This profile implements only SOCKS4's user-id field and SOCKS5's "no
//! authentication" method; the per-version `Auth` parameter exists so a
//! future authentication method (SOCKS5 username/password, GSSAPI) is
//! additive rather than a breaking signature change.

/// The SOCKS4 `USERID` field: an optional identity string sent with every
/// CONNECT request, checked by some proxies against an `identd` lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Socks4Auth(String);

impl Socks4Auth {
    /// Builds a user-id from any string-like value.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    /// The empty user-id, accepted by proxies that do not run `identd`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Socks4Auth {
    fn from(user_id: &str) -> Self {
        Self::new(user_id)
    }
}

/// The only SOCKS5 authentication method this profile selects during
/// negotiation. A zero-sized marker; SOCKS5 entry points take it by value
/// to keep the four-entry-point API surface uniform across versions.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct NoAuth;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_user_id_is_empty() {
        assert_eq!(Socks4Auth::anonymous().as_str(), "");
    }

    #[test]
    fn from_str_round_trips() {
        assert_eq!(Socks4Auth::from("alice").as_str(), "alice");
    }
}
