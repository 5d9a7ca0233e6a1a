//! Client address resolution
//!
//! Precedence: first entry of `X-Forwarded-For`, then `X-Real-IP`, then the
//! transport peer address, then `"unknown"`.

use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::types::UNKNOWN_ADDRESS;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the visitor's address for one request
pub fn resolve_client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(first) = header_str(headers, FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header_str(headers, REAL_IP) {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.10:51234".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.5 , 10.0.0.1, 10.0.0.2"),
            ("x-real-ip", "198.51.100.9"),
        ]);
        assert_eq!(resolve_client_addr(&h, peer()), "203.0.113.5");
    }

    #[test]
    fn test_real_ip_fallback() {
        let h = headers(&[("x-real-ip", "198.51.100.9")]);
        assert_eq!(resolve_client_addr(&h, peer()), "198.51.100.9");

        let blank_forwarded = headers(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "198.51.100.9")]);
        assert_eq!(resolve_client_addr(&blank_forwarded, peer()), "198.51.100.9");
    }

    #[test]
    fn test_peer_then_unknown() {
        assert_eq!(resolve_client_addr(&HeaderMap::new(), peer()), "192.0.2.10");
        assert_eq!(resolve_client_addr(&HeaderMap::new(), None), "unknown");
    }
}
