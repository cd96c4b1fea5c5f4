use anyhow::Result;
use async_trait::async_trait;

use crate::models::capability::CapabilityDescriptor;
use crate::models::message::Message;

/// Base trait for chat completion backends (OpenAI and compatible servers)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Produce the next assistant message for `messages`, offering the backend
    /// the functions described by `capabilities`
    async fn complete(
        &self,
        messages: &[Message],
        capabilities: &[CapabilityDescriptor],
    ) -> Result<Message>;
}
