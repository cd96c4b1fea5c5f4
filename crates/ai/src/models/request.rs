use serde::{Deserialize, Serialize};

use super::capability::CapabilityDescriptor;
use super::message::Message;

/// What travels inward through the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub messages: Vec<Message>,
    pub capabilities: Vec<CapabilityDescriptor>,
}

impl Request {
    /// A fresh request holding a single user message
    pub fn user<S: Into<String>>(text: S) -> Self {
        Request {
            messages: vec![Message::user().with_text(text)],
            capabilities: Vec::new(),
        }
    }

    pub fn is_advertised(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == name)
    }
}

/// What travels back outward: the request that was sent and the backend's reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub request: Request,
    pub message: Message,
}

impl Response {
    pub fn new(request: Request, message: Message) -> Self {
        Self { request, message }
    }
}
