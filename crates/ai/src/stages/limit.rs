use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::errors::ChatResult;
use crate::models::request::{Request, Response};
use crate::pipeline::{Next, Stage};

/// Caps the number of messages sent inward by dropping the oldest ones.
///
/// Eviction ignores roles, so this stage must sit outside the system-prompt stage or
/// it may drop the injected instruction.
pub struct LimitStage {
    limit: usize,
}

impl LimitStage {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[async_trait]
impl Stage for LimitStage {
    fn name(&self) -> &str {
        "limit"
    }

    async fn run(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> ChatResult<Response> {
        let count = request.messages.len();
        if count > self.limit {
            let excess = count - self.limit;
            request.messages.drain(..excess);
            debug!(dropped = excess, limit = self.limit, "trimmed messages");
        }

        next.run(ctx, request).await
    }
}
