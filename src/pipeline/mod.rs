//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext
//!     → chain.rs: Logging (pre)
//!     → stages.rs: e.g. Authenticate → Authorize → RateLimit
//!         each stage: Continue(ctx) | Terminate(response)
//!     → Handler (proxy, login, logout, reset, ...)
//!     → chain.rs: Logging (post), metrics
//! ```
//!
//! # Design Decisions
//! - Stage order is fixed per route at startup
//! - Anonymous routes limit before anything else; authenticated routes
//!   authenticate first so quota is charged to the subject
//! - Components are injected, never ambient

pub mod chain;
pub mod context;
pub mod stage;
pub mod stages;

pub use chain::Pipeline;
pub use context::RequestContext;
pub use stage::{Flow, Handler, Stage};
pub use stages::{Authenticate, Authorize, RateLimit, RequireFields};
