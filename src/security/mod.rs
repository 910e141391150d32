//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity::params (attach server parameters)
//!     → rate_limit.rs (resolve identity, check its bucket)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - One identity per request, resolved once and shared via extensions
//! - Requests with no usable parameters share the anonymous bucket

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiterState, ResolvedIdentity};
