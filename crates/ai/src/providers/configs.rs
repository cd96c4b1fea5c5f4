use serde::{Deserialize, Serialize};

pub const OPENAI_DEFAULT_HOST: &str = "https://api.openai.com";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo-16k";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    /// Base URL without the `/v1` suffix
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        Self {
            host: OPENAI_DEFAULT_HOST.to_string(),
            api_key: String::new(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}
