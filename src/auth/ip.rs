//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::request::Parts};

/// Trait for types that provide access to HTTP headers and extensions.
/// Implemented for both `Parts` and `Request` to allow flexible IP extraction.
pub trait HasHeadersAndExtensions {
    fn headers(&self) -> &axum::http::HeaderMap;
    fn extensions(&self) -> &axum::http::Extensions;
}

impl HasHeadersAndExtensions for Parts {
    fn headers(&self) -> &axum::http::HeaderMap {
        &self.headers
    }
    fn extensions(&self) -> &axum::http::Extensions {
        &self.extensions
    }
}

impl<B> HasHeadersAndExtensions for axum::extract::Request<B> {
    fn headers(&self) -> &axum::http::HeaderMap {
        axum::extract::Request::headers(self)
    }
    fn extensions(&self) -> &axum::http::Extensions {
        axum::extract::Request::extensions(self)
    }
}

/// Extract the client IP address.
///
/// With `behind_proxy`, the first entry of X-Forwarded-For wins. Otherwise (or when the
/// header is absent) the peer address from `ConnectInfo` is used.
pub fn extract_client_ip<T: HasHeadersAndExtensions>(
    source: &T,
    behind_proxy: bool,
) -> Option<String> {
    if behind_proxy {
        if let Some(forwarded_for) = source.headers().get("x-forwarded-for") {
            if let Ok(value) = forwarded_for.to_str() {
                if let Some(first_ip) = value.split(',').next() {
                    let ip = first_ip.trim();
                    if !ip.is_empty() {
                        return Some(ip.to_string());
                    }
                }
            }
        }
    }

    source
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(forwarded: Option<&str>, peer: Option<&str>) -> axum::extract::Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn test_peer_address() {
        let req = request(None, Some("10.0.0.1:5555"));
        assert_eq!(extract_client_ip(&req, false), Some("10.0.0.1".to_string()));
    }

    #[test]
    fn test_forwarded_ignored_without_proxy() {
        let req = request(Some("1.2.3.4"), Some("10.0.0.1:5555"));
        assert_eq!(extract_client_ip(&req, false), Some("10.0.0.1".to_string()));
    }

    #[test]
    fn test_forwarded_first_entry_behind_proxy() {
        let req = request(Some("1.2.3.4, 10.0.0.2"), Some("10.0.0.1:5555"));
        assert_eq!(extract_client_ip(&req, true), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_no_source() {
        let req = request(None, None);
        assert_eq!(extract_client_ip(&req, true), None);
    }
}
