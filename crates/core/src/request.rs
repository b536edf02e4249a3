use crate::identity::Identity;
use std::net::IpAddr;

/// Read-only view of an inbound HTTP request.
///
/// Implemented by web-framework adapters. Every accessor reports absence with
/// `None`; none of them may fail.
pub trait InboundRequest {
    /// HTTP method, e.g. `GET`.
    fn method(&self) -> &str;

    /// URL path without the query string.
    fn path(&self) -> &str;

    /// Raw query string without the leading `?`.
    fn query(&self) -> Option<&str>;

    /// Header value by name. Lookup is case-insensitive.
    fn header(&self, name: &str) -> Option<&str>;

    /// Address of the peer that opened the transport connection.
    fn peer_addr(&self) -> Option<IpAddr>;

    /// Session identifier, if the request carries a session.
    fn session_key(&self) -> Option<&str>;

    /// Authenticated identity, if any.
    fn identity(&self) -> Option<&Identity>;
}
