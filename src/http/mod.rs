//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → identity::params (server parameters from peer + headers)
//!     → security::rate_limit (identity resolution, token bucket)
//!     → handlers.rs
//! ```

pub mod handlers;
pub mod server;

pub use server::HttpServer;
