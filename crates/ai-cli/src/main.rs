use anyhow::{anyhow, bail, Context as _, Result};
use bat::PrettyPrinter;
use clap::Parser;
use console::Term;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ai::capabilities::confirm::Confirm;
use ai::capabilities::images::{HttpDownloader, ImageCapability};
use ai::capabilities::script::ScriptCapability;
use ai::capabilities::Registry;
use ai::context::Context;
use ai::history::FileBackend;
use ai::pipeline::{Chat, Stage};
use ai::providers::base::Provider;
use ai::providers::openai::OpenAiProvider;
use ai::stages::{BackendStage, DispatchStage, HistoryStage, LimitStage, SystemStage};

mod configuration;
mod prompt;

use configuration::Settings;
use prompt::TerminalConfirm;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Message to send
    #[arg(required = true, num_args = 1..)]
    message: Vec<String>,

    /// OpenAI API key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// OpenAI base URL (can also be set via OPENAI_BASE_URL environment variable)
    #[arg(short = 'u', long)]
    base_url: Option<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Configuration file to use instead of the default one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Neither read nor write the conversation history
    #[arg(long)]
    no_history: bool,

    /// Let the model generate images
    #[arg(long)]
    images: bool,

    /// Print the reply as plain text instead of rendered markdown
    #[arg(long)]
    raw: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(api_key) = &self.api_key {
            settings.provider.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url {
            settings.provider.host = base_url.clone();
        }
        if let Some(model) = &self.model {
            settings.provider.model = model.clone();
        }
        if self.no_history {
            settings.history.enabled = false;
        }
        if self.images {
            settings.images.enabled = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);

    if settings.provider.api_key.is_empty() {
        bail!("API key must be provided via --api-key or OPENAI_API_KEY environment variable");
    }

    let provider = Arc::new(OpenAiProvider::new(settings.provider.clone().into_config())?);
    let chat = build_chat(&settings, provider, Arc::new(TerminalConfirm))?;

    let token = CancellationToken::new();
    let ctx = Context::with_cancellation(token.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let response = chat
        .send(&ctx, cli.message.join(" "))
        .await
        .context("failed to send message")?;

    let content = response.message.text();
    if cli.raw || !Term::stdout().is_term() {
        println!("{}", content);
    } else {
        render(content)?;
    }
    Ok(())
}

/// Assemble the stages in the order the conversation flows through them
fn build_chat(
    settings: &Settings,
    provider: Arc<OpenAiProvider>,
    confirm: Arc<dyn Confirm>,
) -> Result<Chat> {
    let mut registry = Registry::new();
    let mut stages: Vec<Box<dyn Stage>> = Vec::new();

    if settings.history.enabled {
        stages.push(Box::new(HistoryStage::new(FileBackend::new(
            &settings.history.path,
        ))));
    }
    stages.push(Box::new(LimitStage::new(settings.history.limit)));

    stages.push(Box::new(
        registry.register(ScriptCapability::shell(confirm.clone()))?,
    ));
    if settings.python {
        stages.push(Box::new(
            registry.register(ScriptCapability::python(confirm))?,
        ));
    }
    if settings.images.enabled {
        let downloader = HttpDownloader::new(&settings.images.output_dir);
        stages.push(Box::new(registry.register(ImageCapability::new(
            provider.clone(),
            Arc::new(downloader),
        ))?));
    }

    stages.push(Box::new(
        DispatchStage::new(Arc::new(registry)).with_max_calls(settings.max_function_calls),
    ));
    stages.push(Box::new(SystemStage::new(settings.system_message())));

    let provider: Arc<dyn Provider> = provider;
    stages.push(Box::new(BackendStage::new(provider)));

    Ok(Chat::new(stages))
}

fn render(content: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .map_err(|e| anyhow!("failed to render reply: {}", e))?;
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai::capabilities::confirm::Always;
    use ai::providers::configs::OpenAiProviderConfig;
    use configuration::{HistorySettings, ImageSettings, ProviderSettings};

    fn settings() -> Settings {
        Settings {
            provider: ProviderSettings {
                host: "http://localhost".to_string(),
                api_key: "key".to_string(),
                model: "gpt-3.5-turbo-16k".to_string(),
                temperature: None,
                max_tokens: None,
            },
            history: HistorySettings {
                enabled: true,
                path: PathBuf::from("history.json"),
                limit: 15,
            },
            max_function_calls: 10,
            images: ImageSettings {
                enabled: false,
                output_dir: PathBuf::from("."),
            },
            python: true,
            system_message: None,
        }
    }

    fn stage_names(settings: &Settings) -> Vec<String> {
        let provider = Arc::new(OpenAiProvider::new(OpenAiProviderConfig::new("key")).unwrap());
        let chat = build_chat(settings, provider, Arc::new(Always(false))).unwrap();
        chat.stages().iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn test_default_stage_order() {
        assert_eq!(
            stage_names(&settings()),
            vec![
                "history",
                "limit",
                "execute_shell_script",
                "execute_python_script",
                "dispatch",
                "system",
                "backend"
            ]
        );
    }

    #[test]
    fn test_optional_stages() {
        let mut settings = settings();
        settings.history.enabled = false;
        settings.python = false;
        settings.images.enabled = true;

        assert_eq!(
            stage_names(&settings),
            vec![
                "limit",
                "execute_shell_script",
                "create_images",
                "dispatch",
                "system",
                "backend"
            ]
        );
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "ai",
            "--api-key",
            "flag-key",
            "--model",
            "gpt-4",
            "--no-history",
            "--images",
            "list",
            "my",
            "files",
        ]);
        let mut settings = settings();
        cli.apply(&mut settings);

        assert_eq!(cli.message.join(" "), "list my files");
        assert_eq!(settings.provider.api_key, "flag-key");
        assert_eq!(settings.provider.model, "gpt-4");
        assert!(!settings.history.enabled);
        assert!(settings.images.enabled);
    }
}
