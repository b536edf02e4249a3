//! Projection from an inbound request to the individual log attributes.

use crate::identity::Identity;
use crate::record::MAX_REMOTE_ADDRESS_LEN;
use crate::request::InboundRequest;
use std::net::{IpAddr, SocketAddr};

/// Header conventionally appended to by each reverse proxy hop.
pub const DEFAULT_FORWARDED_HEADER: &str = "x-forwarded-for";

/// Derives each log attribute from a request.
///
/// Every resolver is a pure read: absent data resolves to an empty string (or
/// `None` for the identity) and nothing here can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAttributeExtractor {
    forwarded_header: String,
}

impl Default for RequestAttributeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestAttributeExtractor {
    pub fn new() -> Self {
        Self::with_forwarded_header(DEFAULT_FORWARDED_HEADER)
    }

    /// Use a different forwarding header, e.g. one set by a trusted edge proxy.
    pub fn with_forwarded_header(name: impl Into<String>) -> Self {
        Self {
            forwarded_header: name.into().trim().to_ascii_lowercase(),
        }
    }

    pub fn forwarded_header(&self) -> &str {
        &self.forwarded_header
    }

    pub fn resolve_identity<R: InboundRequest + ?Sized>(&self, request: &R) -> Option<Identity> {
        request.identity().cloned()
    }

    pub fn resolve_session_key<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        request.session_key().unwrap_or_default().to_string()
    }

    pub fn resolve_http_method<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        request.method().to_string()
    }

    pub fn resolve_path<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        request.path().to_string()
    }

    pub fn resolve_query_string<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        request.query().unwrap_or_default().to_string()
    }

    pub fn resolve_user_agent<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        request.header("user-agent").unwrap_or_default().to_string()
    }

    pub fn resolve_referer<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        request.header("referer").unwrap_or_default().to_string()
    }

    /// Resolve the originating client address.
    ///
    /// The first entry of the forwarding chain wins; without a usable chain the
    /// transport peer is used, and without either the result is empty. The
    /// forwarding header is client-controlled unless a trusted proxy rewrites
    /// it, so callers own that trust boundary. An entry that is not an address
    /// counts as no chain at all.
    pub fn resolve_remote_address<R: InboundRequest + ?Sized>(&self, request: &R) -> String {
        if let Some(client) = request
            .header(&self.forwarded_header)
            .and_then(parse_forwarded_for)
        {
            return client.to_string();
        }

        request
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default()
    }
}

/// First address of a comma-separated forwarding chain, trimmed.
///
/// Returns `None` when the chain is empty, or when its first entry is blank,
/// longer than [`MAX_REMOTE_ADDRESS_LEN`] or not an IP address (a port is
/// allowed, as in `203.0.113.7:4711` or `[2001:db8::1]:443`).
pub fn parse_forwarded_for(value: &str) -> Option<&str> {
    let first = value.split(',').next()?.trim();
    if first.is_empty() || first.len() > MAX_REMOTE_ADDRESS_LEN {
        return None;
    }
    (first.parse::<IpAddr>().is_ok() || first.parse::<SocketAddr>().is_ok()).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::testing::TestRequest;

    #[test]
    fn test_remote_address_without_forwarding_header() {
        let req = TestRequest::get("/?a=b").peer("192.168.0.1");
        let extractor = RequestAttributeExtractor::new();

        assert_eq!(extractor.resolve_remote_address(&req), "192.168.0.1");
        assert_eq!(extractor.resolve_path(&req), "/");
        assert_eq!(extractor.resolve_query_string(&req), "a=b");
    }

    #[test]
    fn test_remote_address_takes_first_forwarded_entry() {
        let extractor = RequestAttributeExtractor::new();
        let cases = [
            ("", "192.168.0.1"),
            ("   ", "192.168.0.1"),
            ("127.0.0.1", "127.0.0.1"),
            ("127.0.0.1,127.0.0.2", "127.0.0.1"),
            ("127.0.0.1, 10.0.0.1, 10.0.0.2", "127.0.0.1"),
            (" 203.0.113.7 ,10.0.0.1", "203.0.113.7"),
            (" ,10.0.0.1", "192.168.0.1"),
            ("2001:db8::7, 10.0.0.1", "2001:db8::7"),
            ("unknown, 10.0.0.1", "192.168.0.1"),
        ];

        for (forwarded, expected) in cases {
            let req = TestRequest::get("/")
                .header("X-Forwarded-For", forwarded)
                .peer("192.168.0.1");
            assert_eq!(
                extractor.resolve_remote_address(&req),
                expected,
                "forwarded header {forwarded:?}"
            );
        }
    }

    #[test]
    fn test_remote_address_empty_when_nothing_known() {
        let req = TestRequest::get("/").no_peer();
        assert_eq!(RequestAttributeExtractor::new().resolve_remote_address(&req), "");
    }

    #[test]
    fn test_custom_forwarded_header() {
        let extractor = RequestAttributeExtractor::with_forwarded_header("X-Real-Client");
        assert_eq!(extractor.forwarded_header(), "x-real-client");

        let req = TestRequest::get("/")
            .header("x-forwarded-for", "10.9.9.9")
            .header("X-Real-Client", "198.51.100.4")
            .peer("192.168.0.1");
        assert_eq!(extractor.resolve_remote_address(&req), "198.51.100.4");
    }

    #[test]
    fn test_request_properties() {
        let user = Identity::new("42", "alice");
        let req = TestRequest::new("POST", "/foo/bar?a=b")
            .header("User-Agent", "Mozilla/5.0")
            .header("Referer", "google.com")
            .header("X-Forwarded-For", "127.0.0.2")
            .session("fake_session")
            .user(user.clone());
        let extractor = RequestAttributeExtractor::new();

        assert_eq!(extractor.resolve_identity(&req), Some(user));
        assert_eq!(extractor.resolve_session_key(&req), "fake_session");
        assert_eq!(extractor.resolve_http_method(&req), "POST");
        assert_eq!(extractor.resolve_path(&req), "/foo/bar");
        assert_eq!(extractor.resolve_query_string(&req), "a=b");
        assert_eq!(extractor.resolve_user_agent(&req), "Mozilla/5.0");
        assert_eq!(extractor.resolve_referer(&req), "google.com");
        assert_eq!(extractor.resolve_remote_address(&req), "127.0.0.2");
    }

    #[test]
    fn test_absent_values_resolve_to_defaults() {
        let req = TestRequest::get("/");
        let extractor = RequestAttributeExtractor::new();

        assert_eq!(extractor.resolve_identity(&req), None);
        assert_eq!(extractor.resolve_session_key(&req), "");
        assert_eq!(extractor.resolve_query_string(&req), "");
        assert_eq!(extractor.resolve_user_agent(&req), "");
        assert_eq!(extractor.resolve_referer(&req), "");
    }

    #[test]
    fn test_parse_forwarded_for() {
        assert_eq!(parse_forwarded_for("1.1.1.1"), Some("1.1.1.1"));
        assert_eq!(parse_forwarded_for("1.1.1.1,2.2.2.2"), Some("1.1.1.1"));
        assert_eq!(parse_forwarded_for(""), None);
        assert_eq!(parse_forwarded_for(" \t"), None);
        assert_eq!(parse_forwarded_for("[::1]:8443"), Some("[::1]:8443"));
        assert_eq!(parse_forwarded_for("203.0.113.7:4711"), Some("203.0.113.7:4711"));
        assert_eq!(parse_forwarded_for("evil.example"), None);
    }

    #[test]
    fn test_oversized_forwarded_entry_falls_back_to_peer() {
        let forged = format!("{},10.0.0.1", "9".repeat(MAX_REMOTE_ADDRESS_LEN + 20));
        assert_eq!(parse_forwarded_for(&forged), None);

        let req = TestRequest::get("/")
            .header("X-Forwarded-For", &forged)
            .peer("192.168.0.1");
        let address = RequestAttributeExtractor::new().resolve_remote_address(&req);
        assert_eq!(address, "192.168.0.1");
    }
}
