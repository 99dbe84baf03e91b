//! Upstream instance.
//!
//! # Responsibilities
//! - Represent one replica of a service (or of the gateway itself)
//! - Count requests and connection failures for status reporting

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use url::Url;

/// A single upstream instance.
#[derive(Debug)]
pub struct Upstream {
    /// Base URL requests are joined onto.
    pub base_url: Url,
    /// Attempts sent to this instance.
    requests: AtomicU64,
    /// Attempts that ended in a connection error.
    failures: AtomicU64,
    /// Connection errors since the last answered attempt.
    consecutive_failures: AtomicU64,
}

/// Point-in-time counters for one instance.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpstreamStats {
    pub url: String,
    pub requests: u64,
    pub failures: u64,
    pub consecutive_failures: u64,
}

impl Upstream {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
        }
    }

    /// Host and port, used as a metrics label.
    pub fn label(&self) -> String {
        match (self.base_url.host_str(), self.base_url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            _ => self.base_url.to_string(),
        }
    }

    pub fn record_attempt(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// The instance answered, whatever the status.
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub fn mark_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> UpstreamStats {
        UpstreamStats {
            url: self.base_url.to_string(),
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }
}
