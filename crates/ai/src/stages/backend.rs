use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::context::Context;
use crate::errors::{ChatError, ChatResult};
use crate::models::request::{Request, Response};
use crate::pipeline::{Next, Stage};
use crate::providers::base::Provider;

/// Terminal stage: sends the request to the completion backend and never calls `next`.
pub struct BackendStage {
    provider: Arc<dyn Provider>,
}

impl BackendStage {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Stage for BackendStage {
    fn name(&self) -> &str {
        "backend"
    }

    async fn run(&self, ctx: &Context, request: Request, _next: Next<'_>) -> ChatResult<Response> {
        debug!(
            messages = request.messages.len(),
            capabilities = request.capabilities.len(),
            "calling backend"
        );

        let message = ctx
            .run_until_cancelled(
                self.provider
                    .complete(&request.messages, &request.capabilities),
            )
            .await
            .ok_or(ChatError::Cancelled)?
            .map_err(ChatError::Backend)?;

        Ok(Response::new(request, message))
    }
}
