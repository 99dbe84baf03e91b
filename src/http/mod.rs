//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, trace)
//!     → routes.rs (route table lookup → pipeline)
//!     → request.rs (buffer body, build RequestContext)
//!     → pipeline stages
//!     → handlers.rs (proxy, login, logout, reset, liveness)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod routes;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{BalancerServer, GatewayServer};
