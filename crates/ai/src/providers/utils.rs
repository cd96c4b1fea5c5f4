use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::models::capability::CapabilityDescriptor;
use crate::models::message::{FunctionCall, Message};
use crate::models::role::Role;

/// Convert messages to OpenAI's chat message specification, using the legacy
/// `function_call` / `function` role format
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = json!({ "role": message.role });

            // Assistant messages that only carry a call are sent with null content
            if message.function_call.is_some() && message.content.is_empty() {
                converted["content"] = Value::Null;
            } else {
                converted["content"] = json!(message.content);
            }
            if let Some(name) = &message.name {
                converted["name"] = json!(name);
            }
            if let Some(call) = &message.function_call {
                converted["function_call"] = json!({
                    "name": call.name,
                    "arguments": call.arguments,
                });
            }

            converted
        })
        .collect()
}

/// Convert capability descriptors to OpenAI's function definitions
pub fn functions_to_openai_spec(capabilities: &[CapabilityDescriptor]) -> Result<Vec<Value>> {
    let mut names = HashSet::new();
    let mut result = Vec::new();

    for capability in capabilities {
        if !names.insert(&capability.name) {
            return Err(anyhow!("Duplicate function name: {}", capability.name));
        }

        result.push(json!({
            "name": capability.name,
            "description": capability.description,
            "parameters": capability.schema(),
        }));
    }

    Ok(result)
}

/// Convert OpenAI's chat completion response to a Message
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No choices in response: {}", response))?;

    let mut message = Message::assistant();
    if let Some(role) = original.get("role") {
        let role: Role = serde_json::from_value(role.clone())
            .map_err(|e| anyhow!("Unexpected message role {}: {}", role, e))?;
        message.role = role;
    }
    if let Some(text) = original.get("content").and_then(|c| c.as_str()) {
        message.content = text.to_string();
    }
    if let Some(name) = original.get("name").and_then(|n| n.as_str()) {
        message.name = Some(name.to_string());
    }

    if let Some(call) = original.get("function_call").filter(|c| !c.is_null()) {
        let name = call
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| anyhow!("Function call without a name: {}", call))?;
        // Some compatible servers send the arguments already decoded
        let arguments = match call.get("arguments") {
            Some(Value::String(raw)) => raw.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        message.function_call = Some(FunctionCall::new(name, arguments));
    }

    Ok(message)
}

/// Extract the image URLs from an image generation response
pub fn openai_response_to_image_urls(response: &Value) -> Result<Vec<String>> {
    let data = response
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("No image data in response: {}", response))?;

    data.iter()
        .map(|image| {
            image
                .get("url")
                .and_then(|u| u.as_str())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Image without a url: {}", image))
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
