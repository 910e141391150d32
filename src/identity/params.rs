//! Server parameters derived from the connection and request headers.
//!
//! # Responsibilities
//! - Define the read-only parameter lookup the resolver depends on
//! - Build CGI-style parameters (`REMOTE_ADDR`, `HTTP_*`, ...) per request
//! - Attach them to the request before identity resolution runs
//!
//! # Design Decisions
//! - Header values are copied as-is; repeated headers are joined with ", "
//! - Values are decoded as UTF-8, lossily, so a present header never goes missing
//! - Header names containing '_' are dropped so they cannot pose as `Foo-Bar`
//! - A request without attached parameters exposes none at all

use std::borrow::Cow;
use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, request::Parts, HeaderMap, Method, Uri, Version},
    middleware::Next,
    response::Response,
};

/// Lookup of a single server parameter by exact name.
pub trait ServerParams {
    fn server_param(&self, name: &str) -> Option<&str>;
}

/// Anything that may carry server parameters.
///
/// Requests constructed without server-side context keep the default,
/// which exposes no parameters.
pub trait RequestSource {
    fn server_params(&self) -> Option<&dyn ServerParams> {
        None
    }
}

/// Owned set of server parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerParamMap {
    params: HashMap<String, String>,
}

impl ServerParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from request parts and the peer address, if known.
    pub fn from_parts(parts: &Parts, peer: Option<SocketAddr>) -> Self {
        Self::from_head(&parts.method, &parts.uri, parts.version, &parts.headers, peer)
    }

    fn from_head(
        method: &Method,
        uri: &Uri,
        version: Version,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Self {
        let mut map = Self::new();

        if let Some(addr) = peer {
            map.insert("REMOTE_ADDR", addr.ip().to_string());
            map.insert("REMOTE_PORT", addr.port().to_string());
        }

        map.insert("REQUEST_METHOD", method.as_str());
        map.insert(
            "REQUEST_URI",
            uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
        );
        if let Some(query) = uri.query() {
            map.insert("QUERY_STRING", query);
        }
        map.insert("SERVER_PROTOCOL", format!("{:?}", version));

        for name in headers.keys() {
            let Some(cgi) = cgi_name(name) else {
                tracing::debug!(header = %name, "Ignoring header with underscore in name");
                continue;
            };
            let values: Vec<Cow<'_, str>> = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()))
                .collect();
            map.insert(cgi, values.join(", "));
        }

        map
    }

    /// Set a parameter, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// CGI meta-variable name for a header.
///
/// `None` for names containing '_', which would be indistinguishable from
/// the '-' spelling once mapped.
fn cgi_name(name: &header::HeaderName) -> Option<String> {
    if *name == header::CONTENT_TYPE {
        return Some("CONTENT_TYPE".to_string());
    }
    if *name == header::CONTENT_LENGTH {
        return Some("CONTENT_LENGTH".to_string());
    }
    if name.as_str().contains('_') {
        return None;
    }
    let mut cgi = String::with_capacity(name.as_str().len() + 5);
    cgi.push_str("HTTP_");
    for c in name.as_str().chars() {
        cgi.push(if c == '-' { '_' } else { c.to_ascii_uppercase() });
    }
    Some(cgi)
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ServerParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ServerParams for ServerParamMap {
    fn server_param(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

impl ServerParams for HashMap<String, String> {
    fn server_param(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl RequestSource for ServerParamMap {
    fn server_params(&self) -> Option<&dyn ServerParams> {
        Some(self)
    }
}

impl RequestSource for HashMap<String, String> {
    fn server_params(&self) -> Option<&dyn ServerParams> {
        Some(self)
    }
}

impl<B> RequestSource for axum::http::Request<B> {
    fn server_params(&self) -> Option<&dyn ServerParams> {
        self.extensions()
            .get::<ServerParamMap>()
            .map(|params| params as &dyn ServerParams)
    }
}

impl RequestSource for Parts {
    fn server_params(&self) -> Option<&dyn ServerParams> {
        self.extensions
            .get::<ServerParamMap>()
            .map(|params| params as &dyn ServerParams)
    }
}

/// Middleware attaching a [`ServerParamMap`] to every request.
pub async fn populate_server_params(mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let params = ServerParamMap::from_head(
        request.method(),
        request.uri(),
        request.version(),
        request.headers(),
        peer,
    );
    request.extensions_mut().insert(params);

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::resolve;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn parts(request: axum::http::Request<Body>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_from_parts_maps_connection_and_headers() {
        let parts = parts(
            axum::http::Request::builder()
                .method("POST")
                .uri("http://example.com/api/v1?page=2")
                .header("Client-IP", "10.1.1.1")
                .header("X-Forwarded-For", "10.2.2.2")
                .header("Content-Type", "application/json")
                .body(Body::empty())
                .unwrap(),
        );
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let params = ServerParamMap::from_parts(&parts, Some(peer));

        assert_eq!(params.get("REMOTE_ADDR"), Some("127.0.0.1"));
        assert_eq!(params.get("REMOTE_PORT"), Some("40000"));
        assert_eq!(params.get("REQUEST_METHOD"), Some("POST"));
        assert_eq!(params.get("REQUEST_URI"), Some("/api/v1?page=2"));
        assert_eq!(params.get("QUERY_STRING"), Some("page=2"));
        assert_eq!(params.get("SERVER_PROTOCOL"), Some("HTTP/1.1"));
        assert_eq!(params.get("HTTP_CLIENT_IP"), Some("10.1.1.1"));
        assert_eq!(params.get("HTTP_X_FORWARDED_FOR"), Some("10.2.2.2"));
        assert_eq!(params.get("CONTENT_TYPE"), Some("application/json"));
        assert_eq!(params.get("HTTP_CONTENT_TYPE"), None);
    }

    #[test]
    fn test_repeated_headers_are_joined_verbatim() {
        let parts = parts(
            axum::http::Request::builder()
                .header("X-Forwarded-For", "10.0.0.1")
                .header("X-Forwarded-For", "10.0.0.2")
                .body(Body::empty())
                .unwrap(),
        );
        let params = ServerParamMap::from_parts(&parts, None);

        assert_eq!(params.get("HTTP_X_FORWARDED_FOR"), Some("10.0.0.1, 10.0.0.2"));
        assert_eq!(params.get("REMOTE_ADDR"), None);
    }

    #[test]
    fn test_request_exposes_params_only_when_attached() {
        let mut request = axum::http::Request::builder()
            .body(Body::empty())
            .unwrap();
        assert!(request.server_params().is_none());

        request
            .extensions_mut()
            .insert(ServerParamMap::from_iter([("REMOTE_ADDR", "10.0.0.9")]));
        let params = request.server_params().unwrap();
        assert_eq!(params.server_param("REMOTE_ADDR"), Some("10.0.0.9"));
        assert_eq!(params.server_param("remote_addr"), None);
    }

    #[test]
    fn test_hash_map_is_a_request_source() {
        let mut map = HashMap::new();
        map.insert("REMOTE_ADDR".to_string(), "10.0.0.4".to_string());
        assert_eq!(
            map.server_params().and_then(|p| p.server_param("REMOTE_ADDR")),
            Some("10.0.0.4")
        );
    }

    #[test]
    fn test_non_ascii_header_values_stay_present() {
        let parts = parts(
            axum::http::Request::builder()
                .header("Client-IP", HeaderValue::from_bytes("café".as_bytes()).unwrap())
                .header("X-Forwarded-For", HeaderValue::from_bytes(b"10.0.0.\xff").unwrap())
                .body(Body::empty())
                .unwrap(),
        );
        let peer: SocketAddr = "10.9.9.9:5000".parse().unwrap();
        let params = ServerParamMap::from_parts(&parts, Some(peer));

        assert_eq!(params.get("HTTP_CLIENT_IP"), Some("café"));
        assert_eq!(params.get("HTTP_X_FORWARDED_FOR"), Some("10.0.0.\u{FFFD}"));
        assert_eq!(resolve(&params), "café");
    }

    #[test]
    fn test_underscored_header_cannot_shadow_dashed_one() {
        let shadowed = parts(
            axum::http::Request::builder()
                .header("client_ip", "6.6.6.6")
                .header("x_forwarded_for", "7.7.7.7")
                .body(Body::empty())
                .unwrap(),
        );
        let peer: SocketAddr = "10.9.9.9:5000".parse().unwrap();
        let params = ServerParamMap::from_parts(&shadowed, Some(peer));

        assert_eq!(params.get("HTTP_CLIENT_IP"), None);
        assert_eq!(params.get("HTTP_X_FORWARDED_FOR"), None);
        assert_eq!(resolve(&params), "10.9.9.9");

        let both = parts(
            axum::http::Request::builder()
                .header("client_ip", "6.6.6.6")
                .header("Client-IP", "10.1.1.1")
                .body(Body::empty())
                .unwrap(),
        );
        let params = ServerParamMap::from_parts(&both, None);
        assert_eq!(params.get("HTTP_CLIENT_IP"), Some("10.1.1.1"));
    }
}
