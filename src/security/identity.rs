//! Client identity derivation.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

use crate::security::headers::X_FORWARDED_FOR;

/// Key used for rate limiting and auth correlation.
///
/// Either the caller's address (`ip:203.0.113.9`) or, once authenticated,
/// its subject (`user:alice`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(format!("ip:{}", ip))
    }

    pub fn from_subject(subject: &str) -> Self {
        Self(format!("user:{}", subject))
    }

    /// Derive the identity of an inbound request.
    ///
    /// The first `X-Forwarded-For` entry is only honored when the gateway
    /// sits behind a trusted front balancer.
    pub fn from_request(peer: SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> Self {
        if trust_forwarded_for {
            let forwarded = headers
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return Self::from_ip(ip);
            }
        }
        Self::from_ip(peer.ip())
    }

    /// Counter store key holding this client's request count.
    pub fn rate_limit_key(&self) -> String {
        format!("rate_limit:{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
