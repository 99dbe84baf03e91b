//! Per-request state threaded through the stages.

use std::net::SocketAddr;
use std::time::Instant;

use crate::proxy::{ForwardContext, ProxiedRequest};
use crate::security::{AuthIdentity, ClientIdentity};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub peer: SocketAddr,
    /// Rate-limit key; switches to `user:{sub}` once authenticated.
    pub client: ClientIdentity,
    pub identity: Option<AuthIdentity>,
    /// Parameters captured by the route pattern.
    pub params: Vec<(String, String)>,
    pub request: ProxiedRequest,
    pub started: Instant,
}

impl RequestContext {
    pub fn new(
        request_id: String,
        peer: SocketAddr,
        client: ClientIdentity,
        request: ProxiedRequest,
    ) -> Self {
        Self {
            request_id,
            peer,
            client,
            identity: None,
            params: Vec::new(),
            request,
            started: Instant::now(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Record `identity` as the caller and attribute quota to it.
    pub fn authenticate(&mut self, identity: AuthIdentity) {
        self.client = identity.client_identity();
        self.identity = Some(identity);
    }

    pub fn forward_context(&self) -> ForwardContext {
        ForwardContext {
            request_id: Some(self.request_id.clone()),
            client_ip: Some(self.peer.ip()),
        }
    }
}
