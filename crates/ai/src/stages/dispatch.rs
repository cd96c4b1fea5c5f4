use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::capabilities::Registry;
use crate::context::Context;
use crate::errors::{CapabilityError, CapabilityResult, ChatError, ChatResult};
use crate::models::message::Message;
use crate::models::request::{Request, Response};
use crate::pipeline::{Next, Stage};

/// Resolves function calls requested by the backend, runs them and feeds the
/// results back until the backend answers without one.
///
/// This is the only stage that calls `next` more than once per pass. Without a
/// cap the loop has no bound of its own.
pub struct DispatchStage {
    registry: Arc<Registry>,
    max_calls: Option<usize>,
}

impl DispatchStage {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            max_calls: None,
        }
    }

    /// Fail the invocation once more than `max_calls` function calls were requested
    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = Some(max_calls);
        self
    }

    fn check_advertised(&self, request: &Request) -> ChatResult<()> {
        match request
            .capabilities
            .iter()
            .find(|c| !self.registry.contains(&c.name))
        {
            Some(missing) => Err(ChatError::UnregisteredCapability(missing.name.clone())),
            None => Ok(()),
        }
    }
}

/// Encode a capability outcome as the content of a function-role message
pub fn encode_result(result: &CapabilityResult<Value>) -> String {
    match result {
        Ok(data) => json!({ "data": data }).to_string(),
        Err(e) => json!({ "error": e.to_string() }).to_string(),
    }
}

#[async_trait]
impl Stage for DispatchStage {
    fn name(&self) -> &str {
        "dispatch"
    }

    async fn run(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> ChatResult<Response> {
        self.check_advertised(&request)?;

        let mut calls = 0;
        loop {
            let response = next.run(ctx, request.clone()).await?;

            let Some(call) = response.message.function_call.clone() else {
                return Ok(response);
            };

            calls += 1;
            if let Some(max) = self.max_calls {
                if calls > max {
                    return Err(ChatError::TooManyFunctionCalls(max));
                }
            }

            if !request.is_advertised(&call.name) {
                warn!(function = %call.name, "backend called a function that was not advertised");
            }
            debug!(function = %call.name, arguments = %call.arguments, "dispatching function call");

            request.messages.push(response.message);

            let result = self.registry.call(ctx, &call).await;
            if let Err(CapabilityError::Cancelled) = result {
                return Err(ChatError::Cancelled);
            }

            request
                .messages
                .push(Message::function(&call.name).with_text(encode_result(&result)));
        }
    }
}
