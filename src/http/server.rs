//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (tracing, timeout, request ID)
//! - Dispatch every request through the route table to its pipeline
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - Axum only accepts the connection; route matching is ours so that
//!   unknown paths and wrong methods get the gateway's error body
//! - The gateway and the front balancer share the dispatcher and differ
//!   only in their route tables

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{build_context, request_id};
use crate::http::routes::{balancer_routes, gateway_routes, Routes};
use crate::lifecycle::shutdown::signalled;
use crate::lifecycle::{BalancerComponents, GatewayComponents};
use crate::observability::logging::{Inbound, RequestLogger};
use crate::observability::metrics;
use crate::routing::Resolution;
use crate::security::ClientIdentity;

/// State injected into the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchState {
    pub routes: Arc<Routes>,
    pub max_body_bytes: usize,
    pub trust_forwarded_for: bool,
}

async fn dispatch(
    State(state): State<DispatchState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let id = request_id(request.headers());
    let client = ClientIdentity::from_request(peer, request.headers(), state.trust_forwarded_for);
    let refused = |route, by, headers: &HeaderMap, error| Refused {
        route,
        by,
        request_id: &id,
        method: &method,
        path: &path,
        client: &client,
        headers,
    }
    .reject(error, started);

    let (pipeline, params) = match state.routes.resolve(&method, &path) {
        Resolution::Matched { target, params } => (target.clone(), params),
        Resolution::MethodNotAllowed => {
            return refused("unmatched", "router", request.headers(), GatewayError::MethodNotAllowed);
        }
        Resolution::NotFound => {
            tracing::debug!(method = %method, path = %path, "No route matched");
            return refused("unmatched", "router", request.headers(), GatewayError::NotFound);
        }
    };

    // The body is consumed below; keep the headers for the rejection record.
    let headers = request.headers().clone();
    let ctx = match build_context(request, peer, state.max_body_bytes, state.trust_forwarded_for).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!(route = pipeline.route(), peer = %peer, error = %e, "Rejected request");
            return refused(pipeline.route(), "body", &headers, e);
        }
    };

    pipeline.execute(ctx.with_params(params)).await
}

/// A request turned away before its pipeline ran.
struct Refused<'a> {
    route: &'static str,
    by: &'static str,
    request_id: &'a str,
    method: &'a Method,
    path: &'a str,
    client: &'a ClientIdentity,
    headers: &'a HeaderMap,
}

impl Refused<'_> {
    /// Log both halves of the request, as a pipeline would, then answer.
    fn reject(self, error: GatewayError, started: Instant) -> Response {
        let logger = RequestLogger;
        logger.inbound(Inbound {
            request_id: self.request_id,
            method: self.method,
            path: self.path,
            client: self.client.as_str(),
            headers: self.headers,
            body: &[],
        });
        let status = error.status_code();
        logger.outbound(self.request_id, status, started.elapsed(), Some(self.by));
        metrics::record_request(self.route, status.as_u16(), started);
        error.into_response()
    }
}

/// Build the Axum router around a route table.
#[allow(deprecated)]
pub fn build_router(state: DispatchState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", any(dispatch))
        .route("/{*path}", any(dispatch))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn serve(
    name: &'static str,
    router: Router,
    listener: TcpListener,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(server = name, address = %addr, "HTTP server starting");

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(signalled(shutdown))
        .await?;

    tracing::info!(server = name, "HTTP server stopped");
    Ok(())
}

fn dispatch_state(routes: Routes, config: &GatewayConfig) -> DispatchState {
    DispatchState {
        routes: Arc::new(routes),
        max_body_bytes: config.limits.max_body_bytes,
        trust_forwarded_for: config.forwarding.trust_forwarded_for,
    }
}

/// Gateway server: authentication, rate limiting and service routing.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(components: &GatewayComponents, config: &GatewayConfig) -> Self {
        let routes = gateway_routes(components, config);
        tracing::debug!(routes = routes.len(), "Gateway route table built");
        let state = dispatch_state(routes, config);
        Self {
            router: build_router(state, Duration::from_secs(config.timeouts.request_secs)),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        serve("gateway", self.router, listener, shutdown).await
    }
}

/// Front balancer: forwards everything to the gateway pool.
pub struct BalancerServer {
    router: Router,
}

impl BalancerServer {
    pub fn new(components: &BalancerComponents, config: &GatewayConfig) -> Self {
        let state = dispatch_state(balancer_routes(components), config);
        Self {
            router: build_router(state, Duration::from_secs(config.timeouts.request_secs)),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        serve("balancer", self.router, listener, shutdown).await
    }
}
