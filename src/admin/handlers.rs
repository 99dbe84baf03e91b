use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::{AdminState, Mode};
use crate::load_balancer::UpstreamStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub mode: Mode,
    /// `ok`, `unavailable`, or `none` when this process has no store.
    pub store: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct PoolStatus {
    pub pool: String,
    pub instances: Vec<UpstreamStats>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let store = match &state.store {
        Some(store) => match store.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(error = %e, "Store ping failed");
                "unavailable"
            }
        },
        None => "none",
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        mode: state.mode,
        store,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

pub async fn get_upstreams(State(state): State<AdminState>) -> Json<Vec<PoolStatus>> {
    Json(
        state
            .pools
            .iter()
            .map(|pool| PoolStatus {
                pool: pool.name().to_string(),
                instances: pool.stats(),
            })
            .collect(),
    )
}
