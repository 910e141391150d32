//! IP-address based identity resolver.

use std::fmt;

use crate::identity::params::RequestSource;

/// Identity returned when no parameter identifies the caller.
pub const ANONYMOUS: &str = "ANONYMOUS";

/// Parameter set by an operator-configured edge proxy.
pub const HTTP_CLIENT_IP: &str = "HTTP_CLIENT_IP";
/// Generic forwarding header, as a server parameter.
pub const HTTP_X_FORWARDED_FOR: &str = "HTTP_X_FORWARDED_FOR";
/// Transport-level peer address.
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";

/// Which parameter produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentitySource {
    ClientIp,
    ForwardedFor,
    RemoteAddr,
    Anonymous,
    /// Produced by a resolver other than [`IpAddressIdentityResolver`].
    Custom,
}

impl IdentitySource {
    /// Lookup order of the cascade. `Anonymous` is the fallback and not listed.
    const PRIORITY: [IdentitySource; 3] = [
        IdentitySource::ClientIp,
        IdentitySource::ForwardedFor,
        IdentitySource::RemoteAddr,
    ];

    /// Server parameter consulted for this source.
    pub fn param_name(&self) -> Option<&'static str> {
        match self {
            IdentitySource::ClientIp => Some(HTTP_CLIENT_IP),
            IdentitySource::ForwardedFor => Some(HTTP_X_FORWARDED_FOR),
            IdentitySource::RemoteAddr => Some(REMOTE_ADDR),
            IdentitySource::Anonymous | IdentitySource::Custom => None,
        }
    }

    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::ClientIp => "client_ip",
            IdentitySource::ForwardedFor => "forwarded_for",
            IdentitySource::RemoteAddr => "remote_addr",
            IdentitySource::Anonymous => "anonymous",
            IdentitySource::Custom => "custom",
        }
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a request to the key its rate-limit budget is tracked under.
pub trait IdentityResolver: Send + Sync {
    /// Returns the caller identity. Never fails.
    fn identity(&self, request: &dyn RequestSource) -> String;

    /// The identity along with a label for where it came from.
    fn identity_with_source(&self, request: &dyn RequestSource) -> (String, IdentitySource) {
        (self.identity(request), IdentitySource::Custom)
    }
}

/// Resolves identity from client IP related server parameters.
///
/// Priority: `HTTP_CLIENT_IP` -> `HTTP_X_FORWARDED_FOR` -> `REMOTE_ADDR`
/// -> [`ANONYMOUS`]. The first present value wins as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpAddressIdentityResolver;

impl IpAddressIdentityResolver {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityResolver for IpAddressIdentityResolver {
    fn identity(&self, request: &dyn RequestSource) -> String {
        resolve(request)
    }

    fn identity_with_source(&self, request: &dyn RequestSource) -> (String, IdentitySource) {
        resolve_with_source(request)
    }
}

/// Resolve the caller identity of `request`.
pub fn resolve<R: RequestSource + ?Sized>(request: &R) -> String {
    resolve_with_source(request).0
}

/// Resolve the caller identity along with the parameter it came from.
pub fn resolve_with_source<R: RequestSource + ?Sized>(request: &R) -> (String, IdentitySource) {
    let Some(params) = request.server_params() else {
        return (ANONYMOUS.to_string(), IdentitySource::Anonymous);
    };

    for source in IdentitySource::PRIORITY {
        let value = source
            .param_name()
            .and_then(|name| params.server_param(name));
        if let Some(value) = value {
            return (value.to_string(), source);
        }
    }

    (ANONYMOUS.to_string(), IdentitySource::Anonymous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::params::ServerParamMap;
    use axum::body::Body;
    use axum::http::Request;

    fn params(pairs: &[(&str, &str)]) -> ServerParamMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_resolves_http_client_ip() {
        let request = params(&[("HTTP_CLIENT_IP", "192.168.1.7")]);
        assert_eq!(resolve(&request), "192.168.1.7");
    }

    #[test]
    fn test_resolves_http_x_forwarded_for() {
        let request = params(&[("HTTP_X_FORWARDED_FOR", "192.168.1.7")]);
        assert_eq!(resolve(&request), "192.168.1.7");
    }

    #[test]
    fn test_resolves_remote_addr() {
        let request = params(&[("REMOTE_ADDR", "192.168.1.7")]);
        assert_eq!(resolve(&request), "192.168.1.7");
    }

    #[test]
    fn test_anonymous_without_related_params() {
        let request = params(&[("REQUEST_METHOD", "GET"), ("HTTP_HOST", "example.com")]);
        assert_eq!(resolve(&request), ANONYMOUS);
        assert_eq!(resolve(&ServerParamMap::new()), ANONYMOUS);
    }

    #[test]
    fn test_anonymous_without_server_context() {
        // Built by hand, never went through the server params middleware.
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(resolve(&request), ANONYMOUS);
        assert_eq!(resolve_with_source(&request).1, IdentitySource::Anonymous);
    }

    #[test]
    fn test_priority_order() {
        let all = params(&[
            ("REMOTE_ADDR", "192.168.1.5"),
            ("HTTP_X_FORWARDED_FOR", "192.168.1.6"),
            ("HTTP_CLIENT_IP", "192.168.1.7"),
        ]);
        assert_eq!(
            resolve_with_source(&all),
            ("192.168.1.7".to_string(), IdentitySource::ClientIp)
        );

        let no_client_ip = params(&[
            ("REMOTE_ADDR", "192.168.1.5"),
            ("HTTP_X_FORWARDED_FOR", "192.168.1.6"),
        ]);
        assert_eq!(
            resolve_with_source(&no_client_ip),
            ("192.168.1.6".to_string(), IdentitySource::ForwardedFor)
        );
    }

    #[test]
    fn test_values_are_not_normalized() {
        let request = params(&[("HTTP_X_FORWARDED_FOR", " 10.0.0.1, 10.0.0.2 ")]);
        assert_eq!(resolve(&request), " 10.0.0.1, 10.0.0.2 ");

        // An empty value is still a present value.
        let request = params(&[("HTTP_CLIENT_IP", ""), ("REMOTE_ADDR", "10.0.0.3")]);
        assert_eq!(resolve(&request), "");
    }

    #[test]
    fn test_param_names_are_case_sensitive() {
        let request = params(&[("http_client_ip", "10.0.0.1"), ("Remote_Addr", "10.0.0.2")]);
        assert_eq!(resolve(&request), ANONYMOUS);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let request = params(&[("REMOTE_ADDR", "192.168.1.5")]);
        let resolver = IpAddressIdentityResolver::new();
        assert_eq!(resolver.identity(&request), resolver.identity(&request));
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(IdentitySource::ForwardedFor.to_string(), "forwarded_for");
        assert_eq!(IdentitySource::ClientIp.param_name(), Some("HTTP_CLIENT_IP"));
        assert_eq!(IdentitySource::Anonymous.param_name(), None);
        assert_eq!(IdentitySource::Custom.as_str(), "custom");
    }
}
