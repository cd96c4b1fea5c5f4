use async_trait::async_trait;
use tracing::trace;

use crate::context::Context;
use crate::errors::{ChatError, ChatResult};
use crate::models::request::{Request, Response};

/// One link in the request/response chain.
///
/// A stage receives the current request and `next`, the rest of the pipeline. It may
/// rewrite the request before handing it on, post-process the response on the way
/// back, or return without calling `next` at all.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used when tracing the pipeline
    fn name(&self) -> &str;

    async fn run(&self, ctx: &Context, request: Request, next: Next<'_>) -> ChatResult<Response>;
}

/// The remaining stages below the one currently running.
///
/// `Next` is `Copy`, so a stage that needs to re-enter the nested pipeline (the
/// dispatch loop) can call it as often as it likes.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Box<dyn Stage>],
}

impl<'a> Next<'a> {
    pub fn new(stages: &'a [Box<dyn Stage>]) -> Self {
        Self { stages }
    }

    /// Number of stages left below this point
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    pub async fn run(self, ctx: &Context, request: Request) -> ChatResult<Response> {
        let Some((stage, rest)) = self.stages.split_first() else {
            return Err(ChatError::EndOfPipeline);
        };

        trace!(
            stage = stage.name(),
            messages = request.messages.len(),
            capabilities = request.capabilities.len(),
            "running stage"
        );
        stage.run(ctx, request, Next::new(rest)).await
    }
}

/// Composes an ordered list of stages into one call. The first stage is outermost.
#[derive(Default)]
pub struct Chat {
    stages: Vec<Box<dyn Stage>>,
}

impl Chat {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Append a stage below the ones already configured
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    /// Send one operator message through the whole pipeline
    pub async fn send<S: Into<String>>(&self, ctx: &Context, text: S) -> ChatResult<Response> {
        self.handle(ctx, Request::user(text)).await
    }

    pub async fn handle(&self, ctx: &Context, request: Request) -> ChatResult<Response> {
        if self.stages.is_empty() {
            return Err(ChatError::NoStages);
        }
        Next::new(&self.stages).run(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use std::sync::{Arc, Mutex};

    /// Records the order in which it sees requests and responses
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Stage for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        async fn run(
            &self,
            ctx: &Context,
            request: Request,
            next: Next<'_>,
        ) -> ChatResult<Response> {
            self.log.lock().unwrap().push(format!("in:{}", self.label));
            let response = next.run(ctx, request).await?;
            self.log.lock().unwrap().push(format!("out:{}", self.label));
            Ok(response)
        }
    }

    struct Echo;

    #[async_trait]
    impl Stage for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, _: &Context, request: Request, _: Next<'_>) -> ChatResult<Response> {
            let text = request.messages.last().map(|m| m.content.clone());
            let message = Message::assistant().with_text(text.unwrap_or_default());
            Ok(Response::new(request, message))
        }
    }

    #[tokio::test]
    async fn test_no_stages() {
        let chat = Chat::default();
        let err = chat.send(&Context::new(), "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::NoStages));
    }

    #[tokio::test]
    async fn test_first_stage_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chat = Chat::default()
            .stage(Recorder {
                label: "a",
                log: log.clone(),
            })
            .stage(Recorder {
                label: "b",
                log: log.clone(),
            })
            .stage(Echo);

        let response = chat.send(&Context::new(), "ping").await.unwrap();
        assert_eq!(response.message.content, "ping");
        assert_eq!(response.request, Request::user("ping"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["in:a", "in:b", "out:b", "out:a"]
        );
    }

    #[tokio::test]
    async fn test_running_past_the_last_stage() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chat = Chat::default().stage(Recorder {
            label: "only",
            log: log.clone(),
        });

        let err = chat.send(&Context::new(), "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::EndOfPipeline));
    }

    #[tokio::test]
    async fn test_stage_can_short_circuit() {
        let chat = Chat::default().stage(Echo).stage(Echo);
        let response = chat.send(&Context::new(), "stop here").await.unwrap();
        assert_eq!(response.message.content, "stop here");
    }
}
