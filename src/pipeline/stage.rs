//! Stage and handler contracts.

use async_trait::async_trait;
use axum::response::Response;

use crate::pipeline::context::RequestContext;

/// Outcome of one stage.
#[derive(Debug)]
pub enum Flow {
    /// Hand the (possibly augmented) context to the next stage.
    Continue(RequestContext),
    /// Answer now; later stages and the handler are skipped.
    Terminate(Response),
}

#[async_trait]
pub trait Stage: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: RequestContext) -> Flow;
}

/// Terminal step of a pipeline.
#[async_trait]
pub trait Handler: Send + Sync + std::fmt::Debug {
    async fn handle(&self, ctx: RequestContext) -> Response;
}
