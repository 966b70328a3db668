//! Client address resolution from proxy headers.
//!
//! # Design Decisions
//! - `CF-Connecting-IP` wins, then `X-Real-IP`, then the first `X-Forwarded-For` entry
//! - Values are trimmed; the first non-empty one is used
//! - The socket peer is the last resort

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the originating client IP.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(ip) = header_value(headers, CF_CONNECTING_IP) {
        return Some(ip.to_string());
    }
    if let Some(ip) = header_value(headers, X_REAL_IP) {
        return Some(ip.to_string());
    }
    if let Some(first) = header_value(headers, X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_string());
    }
    peer.map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn cloudflare_header_wins() {
        let h = headers(&[(CF_CONNECTING_IP, "1.2.3.4"), (X_FORWARDED_FOR, "9.9.9.9")]);
        assert_eq!(client_ip(&h, None).as_deref(), Some("1.2.3.4"));
    }

    #[test]
    fn real_ip_before_forwarded_for() {
        let h = headers(&[(X_REAL_IP, " 5.6.7.8 "), (X_FORWARDED_FOR, "9.9.9.9")]);
        assert_eq!(client_ip(&h, None).as_deref(), Some("5.6.7.8"));
    }

    #[test]
    fn first_forwarded_for_entry() {
        let h = headers(&[(X_FORWARDED_FOR, "9.9.9.9, 10.0.0.1")]);
        assert_eq!(client_ip(&h, None).as_deref(), Some("9.9.9.9"));
    }

    #[test]
    fn blank_headers_fall_through_to_peer() {
        let h = headers(&[(CF_CONNECTING_IP, "  "), (X_FORWARDED_FOR, " ,1.1.1.1")]);
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(client_ip(&h, Some(peer)).as_deref(), Some("127.0.0.1"));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
