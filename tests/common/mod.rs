//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use api_gateway::config::GatewayConfig;
use api_gateway::http::{BalancerServer, GatewayServer};
use api_gateway::lifecycle::{BalancerComponents, GatewayComponents};
use axum::{
    extract::Path,
    http::{Method, Uri},
    routing::{any, get, post},
    Json, Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const SECRET: &str = "integration-secret";
pub const SESSION_TOKEN: &str = "session-token-1";

/// Serve `router` on an ephemeral port.
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    addr
}

/// A backend replica that answers like the users, orders and documents
/// services and tags every body with `served_by`.
pub async fn start_mock_backend(name: &'static str) -> SocketAddr {
    let router = Router::new()
        .route(
            "/login",
            post(move |Json(body): Json<Value>| async move {
                Json(json!({
                    "token": SESSION_TOKEN,
                    "username": body["username"],
                    "served_by": name,
                }))
            }),
        )
        .route(
            "/orders",
            get(move || async move {
                Json(json!([
                    {"order_id": 1, "items": ["apple", "pear"], "served_by": name},
                    {"order_id": 2, "items": ["fig"], "served_by": name},
                    {"order_id": 3, "items": [], "served_by": name},
                ]))
            }),
        )
        .route(
            "/documents/{id}",
            get(move |Path(id): Path<String>| async move {
                Json(json!({
                    "_id": id,
                    "text": "x".repeat(150),
                    "is_public": true,
                    "owner": "alice",
                    "served_by": name,
                }))
            }),
        )
        .fallback(any(move |method: Method, uri: Uri| async move {
            Json(json!({
                "served_by": name,
                "method": method.as_str(),
                "path": uri.path(),
            }))
        }));
    spawn_router(router).await
}

/// An address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn urls(addrs: &[SocketAddr]) -> Vec<String> {
    addrs.iter().map(|a| format!("http://{}", a)).collect()
}

/// Config routing every service to `addrs`.
pub fn config_for(addrs: &[SocketAddr]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.services.users.instances = urls(addrs);
    config.services.orders.instances = urls(addrs);
    config.services.documents.instances = urls(addrs);
    config.auth.jwt_secret = SECRET.to_string();
    config.timeouts.upstream_secs = 3;
    config
}

pub async fn spawn_gateway(config: &GatewayConfig) -> SocketAddr {
    let components = GatewayComponents::build(config).unwrap();
    spawn_router(GatewayServer::new(&components, config).router()).await
}

pub async fn spawn_balancer(config: &GatewayConfig) -> SocketAddr {
    let components = BalancerComponents::build(config).unwrap();
    spawn_router(BalancerServer::new(&components, config).router()).await
}

/// HS256 token for `sub`, expiring `ttl_secs` from now (negative for expired).
pub fn token(sub: &str, ttl_secs: i64) -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
    encode(
        &Header::default(),
        &json!({"sub": sub, "iat": now, "exp": now + ttl_secs}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}
