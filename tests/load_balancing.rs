//! Round-robin distribution and failover through the front balancer.

use api_gateway::error::ALL_INSTANCES_UNAVAILABLE;
use axum::{http::StatusCode, routing::any, Json, Router};
use serde_json::{json, Value};

mod common;

async fn served_by(base: &str, path: &str) -> (u16, Value) {
    let res = common::client().get(format!("{}{}", base, path)).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

fn balancer_config(instances: &[std::net::SocketAddr]) -> api_gateway::GatewayConfig {
    let mut config = common::config_for(instances);
    config.gateway.instances = common::urls(instances);
    config
}

#[tokio::test]
async fn rotates_across_healthy_instances() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let c = common::start_mock_backend("c").await;
    let lb = common::spawn_balancer(&balancer_config(&[a, b, c])).await;
    let base = format!("http://{}", lb);

    let mut seen = Vec::new();
    for _ in 0..6 {
        let (status, body) = served_by(&base, "/anything/here").await;
        assert_eq!(status, 200);
        assert_eq!(body["path"], "/anything/here");
        seen.push(body["served_by"].as_str().unwrap().to_string());
    }
    assert_eq!(seen, vec!["a", "b", "c", "a", "b", "c"]);
}

#[tokio::test]
async fn skips_unreachable_instance() {
    let a = common::start_mock_backend("a").await;
    let down = common::unreachable_addr().await;
    let c = common::start_mock_backend("c").await;
    let lb = common::spawn_balancer(&balancer_config(&[a, down, c])).await;
    let base = format!("http://{}", lb);

    let mut seen = Vec::new();
    for _ in 0..6 {
        let (status, body) = served_by(&base, "/").await;
        assert_eq!(status, 200);
        seen.push(body["served_by"].as_str().unwrap().to_string());
    }
    assert_eq!(seen, vec!["a", "c", "c", "a", "c", "c"]);
}

#[tokio::test]
async fn all_instances_down_is_503() {
    let x = common::unreachable_addr().await;
    let y = common::unreachable_addr().await;
    let lb = common::spawn_balancer(&balancer_config(&[x, y])).await;

    let (status, body) = served_by(&format!("http://{}", lb), "/orders").await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], ALL_INSTANCES_UNAVAILABLE);
    assert_eq!(body["code"], "upstream_unavailable");
}

#[tokio::test]
async fn upstream_error_status_is_relayed_without_failover() {
    let broken = common::spawn_router(Router::new().fallback(any(|| async {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"served_by": "broken"})))
    })))
    .await;
    let ok = common::start_mock_backend("ok").await;
    let lb = common::spawn_balancer(&balancer_config(&[broken, ok])).await;

    let (status, body) = served_by(&format!("http://{}", lb), "/x").await;
    assert_eq!(status, 500);
    assert_eq!(body["served_by"], "broken");
}

#[tokio::test]
async fn balancer_fronts_gateway_instances() {
    let backend = common::start_mock_backend("svc").await;
    let config = common::config_for(&[backend]);
    let g1 = common::spawn_gateway(&config).await;
    let g2 = common::spawn_gateway(&config).await;
    let lb = common::spawn_balancer(&balancer_config(&[g1, g2])).await;

    let (status, body) = served_by(&format!("http://{}", lb), "/").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let res = common::client()
        .get(format!("http://{}/orders", lb))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}
