//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (path pattern, method set)
//!     → Return: Matched pipeline, MethodNotAllowed or NotFound
//!
//! Route Compilation (at startup):
//!     http/routes.rs builds one pipeline per route
//!     → Compile patterns
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod router;

pub use matcher::{MethodMatcher, PathPattern};
pub use router::{Resolution, RouteTable};
