//! Caller network address.
//!
//! Taken from the TCP peer recorded by `ConnectInfo`. Forwarding headers are
//! ignored since any client can set them.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions},
};

/// Recorded when the server runs without connection info (tests, some proxies).
pub const UNKNOWN_IP: &str = "unknown";

/// Peer IP of the current connection, or `"unknown"`.
pub fn peer_ip(extensions: &Extensions) -> String {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Extractor for the caller's IP as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(peer_ip(&parts.extensions)))
    }
}
