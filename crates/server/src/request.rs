//! `InboundRequest` adapter for axum requests.

use crate::middleware::session::SessionKey;
use axum::extract::{ConnectInfo, Request};
use reqlog_core::{Identity, InboundRequest};
use std::net::{IpAddr, SocketAddr};

/// Borrowed view of an axum request for the extractor.
///
/// The peer address comes from the `ConnectInfo<SocketAddr>` extension, so the
/// router must be served with `into_make_service_with_connect_info`. Session
/// and identity come from the extensions set by the session and auth layers.
pub struct AxumRequest<'a>(&'a Request);

impl<'a> AxumRequest<'a> {
    pub fn new(request: &'a Request) -> Self {
        Self(request)
    }
}

impl InboundRequest for AxumRequest<'_> {
    fn method(&self) -> &str {
        self.0.method().as_str()
    }

    fn path(&self) -> &str {
        self.0.uri().path()
    }

    fn query(&self) -> Option<&str> {
        self.0.uri().query()
    }

    fn header(&self, name: &str) -> Option<&str> {
        // Non-UTF-8 values count as absent.
        self.0.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn peer_addr(&self) -> Option<IpAddr> {
        self.0
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    }

    fn session_key(&self) -> Option<&str> {
        self.0.extensions().get::<SessionKey>().map(SessionKey::as_str)
    }

    fn identity(&self) -> Option<&Identity> {
        self.0.extensions().get::<Identity>()
    }
}
