use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use ai::providers::configs::{OpenAiProviderConfig, OPENAI_DEFAULT_HOST, OPENAI_DEFAULT_MODEL};

pub const DEFAULT_INSTRUCTIONS: &str = "You're a command line tool 'ai'. Your task is to talk \
with the user and help them solve any problem using the available functions. Please remember \
that they return stdout, stderr and status when creating scripts (use print statements in python).";

/// Environment variables shared with the backend as part of the system message
const USEFUL_ENV: &[&str] = &["LANG", "PWD", "HOME", "PATH", "TERM"];

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: normalize_host(&self.host),
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// OpenAI base URLs are often given with the `/v1` suffix; the provider adds it itself
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    host.strip_suffix("/v1").unwrap_or(host).to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    pub enabled: bool,
    pub path: PathBuf,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub history: HistorySettings,
    pub max_function_calls: usize,
    pub images: ImageSettings,
    pub python: bool,
    #[serde(default)]
    pub system_message: Option<String>,
}

impl Settings {
    /// Load settings from `file` (or the default config file) and the environment.
    ///
    /// Precedence, lowest first: built-in defaults, `OPENAI_API_KEY` / `OPENAI_BASE_URL`,
    /// the TOML file, then `AI_`-prefixed variables such as `AI_PROVIDER__MODEL`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("provider.host", default_host())?
            .set_default("provider.api_key", default_api_key())?
            .set_default("provider.model", OPENAI_DEFAULT_MODEL)?
            .set_default("history.enabled", true)?
            .set_default("history.path", path_string(&default_history_path()))?
            .set_default("history.limit", 15_i64)?
            .set_default("max_function_calls", 10_i64)?
            .set_default("images.enabled", false)?
            .set_default("images.output_dir", ".")?
            .set_default("python", true)?;

        match file {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(path) = default_config_path() {
                    builder = builder.add_source(
                        File::from(path)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix("AI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to load configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("invalid configuration")?;
        tracing::debug!(history = ?settings.history, images = ?settings.images, "loaded settings");
        Ok(settings)
    }

    /// The instruction handed to the backend ahead of every conversation
    pub fn system_message(&self) -> String {
        let instructions = self
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_INSTRUCTIONS);

        json!({
            "message": instructions,
            "os": {
                "name": env::consts::OS,
                "family": env::consts::FAMILY,
                "arch": env::consts::ARCH,
                "env": useful_env(),
            },
        })
        .to_string()
    }
}

fn useful_env() -> BTreeMap<String, String> {
    env::vars()
        .filter(|(key, _)| USEFUL_ENV.contains(&key.as_str()))
        .collect()
}

fn default_host() -> String {
    env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_DEFAULT_HOST.to_string())
}

fn default_api_key() -> String {
    env::var("OPENAI_API_KEY").unwrap_or_default()
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ai").join("config.toml"))
}

/// `<state_dir>/ai/history.json`, falling back to the local data directory on
/// platforms without a state directory
pub fn default_history_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ai")
        .join("history.json")
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
