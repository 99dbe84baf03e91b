//! Backend proxy subsystem.
//!
//! # Data Flow
//! ```text
//! axum Request
//!     → request.rs (buffer into ProxiedRequest, 413 over the body limit)
//!     → forward.rs (strip hop-by-hop, add X-Forwarded-For/X-Request-ID,
//!                   one bounded-timeout attempt → ProxiedResponse | ConnectionError)
//!     → transform.rs (optional reshape keyed on request query/headers)
//!     → ProxiedResponse → axum Response
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered so a request can be replayed on another instance
//! - Upstream status and body are relayed verbatim, 4xx/5xx included
//! - Timeouts are connection errors, so they fail over like refusals

pub mod forward;
pub mod request;
pub mod transform;

pub use forward::{ConnectionError, Forward, ForwardContext, HttpForwarder};
pub use request::{ProxiedRequest, ProxiedResponse};
pub use transform::{apply_transforms, ResponseTransform};
