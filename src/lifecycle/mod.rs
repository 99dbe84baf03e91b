//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build components → Bind listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Stop accepting → Drain in-flight → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then components, then listeners
//! - Every listener (gateway, admin) subscribes to the same broadcast
//! - Draining is bounded by the request timeout, then the process exits

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{BalancerComponents, GatewayComponents, StartupError};
