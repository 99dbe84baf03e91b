//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and proxy produce:
//!     → logging.rs (inbound/outbound records, redacted)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every record and is forwarded upstream
//! - Credentials are masked before they reach any sink

pub mod logging;
pub mod metrics;
