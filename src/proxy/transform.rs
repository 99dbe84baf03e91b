//! Response transforms applied on top of pass-through.
//!
//! A transform only ever sees 2xx JSON bodies; anything else is relayed
//! untouched.

use std::sync::Arc;

use axum::http::Method;
use serde_json::{json, Map, Value};

use crate::proxy::request::{ProxiedRequest, ProxiedResponse};

pub const CLIENT_TYPE: &str = "client-type";
pub const MOBILE_APP: &str = "MobileApp";

const PREVIEW_CHARS: usize = 100;

pub trait ResponseTransform: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn applies(&self, request: &ProxiedRequest) -> bool;

    /// Rewrite the upstream body. `None` leaves it unchanged.
    fn transform(&self, request: &ProxiedRequest, body: Value) -> Option<Value>;
}

fn is_mobile(request: &ProxiedRequest) -> bool {
    request
        .header_str(CLIENT_TYPE)
        .is_some_and(|v| v.eq_ignore_ascii_case(MOBILE_APP))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep only orders whose `order_id` matches the `order_id` query parameter.
#[derive(Debug, Default)]
pub struct OrderIdFilter;

impl ResponseTransform for OrderIdFilter {
    fn name(&self) -> &'static str {
        "order_id_filter"
    }

    fn applies(&self, request: &ProxiedRequest) -> bool {
        request.method == Method::GET && request.query_param("order_id").is_some()
    }

    fn transform(&self, request: &ProxiedRequest, body: Value) -> Option<Value> {
        let wanted = request.query_param("order_id")?;
        let Value::Array(orders) = body else {
            return None;
        };
        let kept = orders
            .into_iter()
            .filter(|order| {
                order
                    .get("order_id")
                    .and_then(scalar_text)
                    .is_some_and(|id| id == wanted)
            })
            .collect();
        Some(Value::Array(kept))
    }
}

/// Compact order list for mobile clients.
#[derive(Debug, Default)]
pub struct MobileOrderSummary;

impl ResponseTransform for MobileOrderSummary {
    fn name(&self) -> &'static str {
        "mobile_order_summary"
    }

    fn applies(&self, request: &ProxiedRequest) -> bool {
        request.method == Method::GET && is_mobile(request)
    }

    fn transform(&self, _request: &ProxiedRequest, body: Value) -> Option<Value> {
        let Value::Array(orders) = body else {
            return None;
        };
        let summary: Vec<Value> = orders
            .iter()
            .map(|order| {
                let item_count = match order.get("items") {
                    Some(Value::Array(items)) => items.len() as u64,
                    _ => order.get("item_count").and_then(Value::as_u64).unwrap_or(0),
                };
                json!({
                    "order_id": order.get("order_id").cloned().unwrap_or(Value::Null),
                    "item_count": item_count,
                })
            })
            .collect();
        let count = summary.len();
        Some(json!({ "orders": summary, "count": count }))
    }
}

/// Document preview for mobile clients.
#[derive(Debug, Default)]
pub struct MobileDocumentSummary;

impl ResponseTransform for MobileDocumentSummary {
    fn name(&self) -> &'static str {
        "mobile_document_summary"
    }

    fn applies(&self, request: &ProxiedRequest) -> bool {
        request.method == Method::GET && is_mobile(request)
    }

    fn transform(&self, request: &ProxiedRequest, body: Value) -> Option<Value> {
        let Value::Object(doc) = body else {
            return None;
        };
        let id = doc
            .get("_id")
            .or_else(|| doc.get("id"))
            .cloned()
            .or_else(|| request.path.rsplit('/').next().map(|s| Value::String(s.to_string())))
            .unwrap_or(Value::Null);
        let preview: String = doc
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .chars()
            .take(PREVIEW_CHARS)
            .collect();

        let mut out = Map::new();
        out.insert("id".into(), id);
        out.insert("preview".into(), Value::String(preview));
        out.insert(
            "is_public".into(),
            doc.get("is_public").cloned().unwrap_or(Value::Bool(true)),
        );
        Some(Value::Object(out))
    }
}

/// Run every applicable transform, in order, over a successful JSON response.
pub fn apply_transforms(
    transforms: &[Arc<dyn ResponseTransform>],
    request: &ProxiedRequest,
    response: ProxiedResponse,
) -> ProxiedResponse {
    if !response.status.is_success() {
        return response;
    }
    let active: Vec<&Arc<dyn ResponseTransform>> =
        transforms.iter().filter(|t| t.applies(request)).collect();
    if active.is_empty() {
        return response;
    }
    let Some(mut body) = response.json_body() else {
        return response;
    };

    let mut changed = false;
    for transform in active {
        if let Some(next) = transform.transform(request, body.clone()) {
            tracing::debug!(transform = transform.name(), "Response transformed");
            body = next;
            changed = true;
        }
    }
    if changed {
        response.with_json_body(&body)
    } else {
        response
    }
}
