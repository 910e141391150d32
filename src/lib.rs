//! Caller identity resolution for rate limiting.
//!
//! Resolves the key a rate limiter tracks a caller under from CGI-style
//! server parameters, in priority order `HTTP_CLIENT_IP`,
//! `HTTP_X_FORWARDED_FOR`, `REMOTE_ADDR`, falling back to `"ANONYMOUS"`.
//! The surrounding modules wire the resolver into an axum service.

pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use identity::{resolve, IdentityResolver, IpAddressIdentityResolver, ANONYMOUS};
pub use lifecycle::Shutdown;
