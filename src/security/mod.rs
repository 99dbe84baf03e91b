//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (ip:{addr}, or user:{sub} once authenticated)
//!     → auth.rs (bearer token → Valid | Invalid | Expired)
//!     → access_control.rs (pluggable authorization policy)
//!     → rate_limit.rs (fixed-window counter in the shared store)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-For) before proxying
//! ```
//!
//! # Design Decisions
//! - Checks report typed outcomes; the pipeline turns them into responses
//! - Missing or malformed credentials are `Invalid`, never a fault
//! - Store outages surface as `StoreError` so callers pick fail-open or fail-closed

pub mod access_control;
pub mod auth;
pub mod headers;
pub mod identity;
pub mod rate_limit;

pub use access_control::AccessPolicy;
pub use auth::{bearer_token, AuthIdentity, Authenticator, TokenStatus};
pub use identity::ClientIdentity;
pub use rate_limit::{Admission, RateLimiter};
