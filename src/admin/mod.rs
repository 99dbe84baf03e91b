//! Admin API.
//!
//! Served on its own listener, behind a bearer API key:
//! - `GET /admin/status`: version, mode, store reachability, uptime
//! - `GET /admin/upstreams`: per-instance attempt and failure counters

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use crate::lifecycle::{BalancerComponents, GatewayComponents};
use crate::load_balancer::UpstreamPool;
use crate::store::CounterStore;

use self::auth::admin_auth_middleware;
use self::handlers::{get_status, get_upstreams};

/// Which role this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Gateway,
    Balancer,
}

#[derive(Debug, Clone)]
pub struct AdminState {
    pub mode: Mode,
    pub api_key: Arc<str>,
    pub pools: Vec<Arc<UpstreamPool>>,
    pub store: Option<Arc<dyn CounterStore>>,
    pub started: Instant,
}

impl AdminState {
    pub fn for_gateway(components: &GatewayComponents, api_key: &str) -> Self {
        Self {
            mode: Mode::Gateway,
            api_key: api_key.into(),
            pools: components.services.pools().into_iter().cloned().collect(),
            store: Some(components.store.clone()),
            started: Instant::now(),
        }
    }

    pub fn for_balancer(components: &BalancerComponents, api_key: &str) -> Self {
        Self {
            mode: Mode::Balancer,
            api_key: api_key.into(),
            pools: vec![components.pool.clone()],
            store: None,
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/upstreams", get(get_upstreams))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router() -> Router {
        let components = GatewayComponents::build(&GatewayConfig::default()).unwrap();
        setup_admin_router(AdminState::for_gateway(&components, "letmein"))
    }

    fn get(path: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(path);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_key() {
        let response = router().oneshot(get("/admin/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = router().oneshot(get("/admin/status", Some("nope"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_reports_mode_and_store() {
        let response = router().oneshot(get("/admin/status", Some("letmein"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["mode"], "gateway");
        assert_eq!(body["store"], "ok");
    }

    #[tokio::test]
    async fn upstreams_lists_every_pool() {
        let response = router().oneshot(get("/admin/upstreams", Some("letmein"))).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        let names: Vec<_> = body.iter().map(|p| p["pool"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["users", "orders", "documents"]);
        assert_eq!(body[0]["instances"][0]["url"], "http://127.0.0.1:5001/");
    }
}
