use async_trait::async_trait;

use crate::context::Context;
use crate::errors::ChatResult;
use crate::models::message::Message;
use crate::models::request::{Request, Response};
use crate::pipeline::{Next, Stage};

/// Puts an instruction in front of the conversation for the duration of one
/// call and hides it again from every stage further out.
pub struct SystemStage {
    message: String,
}

impl SystemStage {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Remove every system-role message, keeping the order of the rest
pub fn strip_system_messages(messages: &mut Vec<Message>) {
    messages.retain(|message| !message.is_system());
}

#[async_trait]
impl Stage for SystemStage {
    fn name(&self) -> &str {
        "system"
    }

    async fn run(&self, ctx: &Context, mut request: Request, next: Next<'_>) -> ChatResult<Response> {
        request
            .messages
            .insert(0, Message::system().with_text(&self.message));

        let mut response = next.run(ctx, request).await?;
        strip_system_messages(&mut response.request.messages);
        Ok(response)
    }
}
