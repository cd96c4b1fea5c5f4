use serde::{Deserialize, Serialize};

use super::role::Role;

/// A request from the backend to invoke a named capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Encoded parameter blob, passed through untouched until dispatch
    pub arguments: String,
}

impl FunctionCall {
    pub fn new<N: Into<String>, A: Into<String>>(name: N, arguments: A) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from the backend
pub struct Message {
    pub role: Role,
    /// Capability name, only meaningful for function-role messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl Message {
    fn new(role: Role) -> Self {
        Message {
            role,
            name: None,
            content: String::new(),
            function_call: None,
        }
    }

    pub fn system() -> Self {
        Self::new(Role::System)
    }

    pub fn user() -> Self {
        Self::new(Role::User)
    }

    pub fn assistant() -> Self {
        Self::new(Role::Assistant)
    }

    /// Create a function result message for the capability `name`
    pub fn function<S: Into<String>>(name: S) -> Self {
        Self::new(Role::Function).with_name(name)
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.content = text.into();
        self
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_function_call(mut self, function_call: FunctionCall) -> Self {
        self.function_call = Some(function_call);
        self
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    pub fn text(&self) -> &str {
        &self.content
    }
}
