use async_trait::async_trait;
use tracing::{debug, warn};

use crate::context::Context;
use crate::errors::{ChatError, ChatResult};
use crate::history::{Backend, Format, Json};
use crate::models::message::Message;
use crate::models::request::{Request, Response};
use crate::pipeline::{Next, Stage};

/// Loads the stored transcript ahead of the request and stores the finished
/// exchange once the backend has answered.
pub struct HistoryStage<B: Backend, F: Format = Json> {
    backend: B,
    format: F,
}

impl<B: Backend> HistoryStage<B, Json> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            format: Json,
        }
    }
}

impl<B: Backend, F: Format> HistoryStage<B, F> {
    pub fn with_format(backend: B, format: F) -> Self {
        Self { backend, format }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn load(&self) -> ChatResult<Vec<Message>> {
        let Some(bytes) = self.backend.read().await.map_err(ChatError::ReadHistory)? else {
            return Ok(Vec::new());
        };
        self.format
            .decode(&bytes)
            .map_err(ChatError::DecodeHistory)
    }

    async fn save(&self, response: &Response) -> anyhow::Result<()> {
        let messages: Vec<Message> = response
            .request
            .messages
            .iter()
            .chain(std::iter::once(&response.message))
            .filter(|message| !message.is_system())
            .cloned()
            .collect();

        let bytes = self.format.encode(&messages)?;
        self.backend.write(bytes).await?;
        debug!(messages = messages.len(), "saved history");
        Ok(())
    }
}

#[async_trait]
impl<B: Backend, F: Format> Stage for HistoryStage<B, F> {
    fn name(&self) -> &str {
        "history"
    }

    async fn run(&self, ctx: &Context, request: Request, next: Next<'_>) -> ChatResult<Response> {
        let mut request = request;
        let mut messages = self.load().await?;
        messages.append(&mut request.messages);
        request.messages = messages;

        let response = next.run(ctx, request).await?;

        // Persist failures after a successful reply are only logged.
        if let Err(e) = self.save(&response).await {
            warn!(error = %e, "failed to save history");
        }

        Ok(response)
    }
}
