//! Header manipulation for proxied traffic.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers (and `Host`) before forwarding
//! - Strip headers named by `Connection`
//! - Append the client address to X-Forwarded-For
//!
//! # Design Decisions
//! - `Content-Length` is dropped too; the outbound body is re-framed
//! - Forwarded-for is appended, never replaced

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [HeaderName; 10] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
    HeaderName::from_static("keep-alive"),
];

/// Return a copy of `headers` without hop-by-hop headers.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = headers.clone();
    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        out.remove(name);
    }
    out
}

/// Append `client` to the X-Forwarded-For chain.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, client),
        _ => client.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_host_and_connection_scoped_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway:5000"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert("client-type", HeaderValue::from_static("MobileApp"));

        let out = strip_hop_by_hop(&headers);
        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::CONNECTION).is_none());
        assert!(out.get("x-session-hint").is_none());
        assert!(out.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(out.get(header::AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(out.get("client-type").unwrap(), "MobileApp");
    }

    #[test]
    fn forwarded_for_is_appended() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1".parse().unwrap());
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.0.0.1");

        append_forwarded_for(&mut headers, "10.0.0.2".parse().unwrap());
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.0.0.1, 10.0.0.2");
    }
}
