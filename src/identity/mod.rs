//! Caller identity resolution.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → params.rs (CGI-style server parameters: REMOTE_ADDR, HTTP_*)
//!     → resolver.rs (priority cascade over three well-known keys)
//!     → identity string handed to the rate limiter as its bucket key
//! ```
//!
//! # Design Decisions
//! - Resolution is total: every input maps to some identity, falling back
//!   to [`ANONYMOUS`]
//! - Values are used verbatim; no trimming, list splitting or IP validation
//! - Requests built without server-side context expose no parameters and
//!   resolve like an empty parameter set

pub mod params;
pub mod resolver;

pub use params::{RequestSource, ServerParamMap, ServerParams};
pub use resolver::{
    resolve, resolve_with_source, IdentityResolver, IdentitySource, IpAddressIdentityResolver,
    ANONYMOUS,
};
