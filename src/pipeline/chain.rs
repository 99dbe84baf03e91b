//! Pipeline executor.

use std::sync::Arc;
use std::time::Instant;

use axum::response::Response;

use crate::observability::logging::{Inbound, RequestLogger};
use crate::observability::metrics;
use crate::pipeline::context::RequestContext;
use crate::pipeline::stage::{Flow, Handler, Stage};

/// Ordered stages in front of one handler.
///
/// The logger records the inbound request before the first stage and the
/// outcome after the handler or the terminating stage, exactly once each.
#[derive(Debug, Clone)]
pub struct Pipeline {
    route: &'static str,
    stages: Vec<Arc<dyn Stage>>,
    handler: Arc<dyn Handler>,
    logger: RequestLogger,
}

impl Pipeline {
    pub fn new(route: &'static str, handler: Arc<dyn Handler>) -> Self {
        Self {
            route,
            stages: Vec::new(),
            handler,
            logger: RequestLogger,
        }
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append `stage` only when `enabled`.
    pub fn stage_if(self, enabled: bool, stage: impl Stage + 'static) -> Self {
        if enabled {
            self.stage(stage)
        } else {
            self
        }
    }

    pub fn route(&self) -> &'static str {
        self.route
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn execute(&self, ctx: RequestContext) -> Response {
        let request_id = ctx.request_id.clone();
        let started = ctx.started;

        self.logger.inbound(Inbound {
            request_id: &request_id,
            method: &ctx.request.method,
            path: &ctx.request.path,
            client: ctx.client.as_str(),
            headers: &ctx.request.headers,
            body: &ctx.request.body,
        });

        let mut ctx = ctx;
        for stage in &self.stages {
            match stage.run(ctx).await {
                Flow::Continue(next) => ctx = next,
                Flow::Terminate(response) => {
                    return self.finish(&request_id, started, response, Some(stage.name()));
                }
            }
        }

        let response = self.handler.handle(ctx).await;
        self.finish(&request_id, started, response, None)
    }

    fn finish(
        &self,
        request_id: &str,
        started: Instant,
        response: Response,
        terminated_by: Option<&str>,
    ) -> Response {
        self.logger
            .outbound(request_id, response.status(), started.elapsed(), terminated_by);
        metrics::record_request(self.route, response.status().as_u16(), started);
        response
    }
}
