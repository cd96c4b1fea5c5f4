use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use super::{Arguments, Capability};
use crate::context::Context;
use crate::errors::{CapabilityError, CapabilityResult};
use crate::models::capability::{CapabilityDescriptor, Parameter};

pub const SIZES: [&str; 3] = ["256x256", "512x512", "1024x1024"];

/// External image generation backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate `number` images and return the URLs they can be fetched from
    async fn generate(&self, prompt: &str, number: u32, size: &str) -> Result<Vec<String>>;
}

/// Fetches a generated image and stores it locally
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<PathBuf>;
}

/// Downloads over HTTP into a directory, naming files after the URL's last path segment
pub struct HttpDownloader {
    client: reqwest::Client,
    dir: PathBuf,
}

impl HttpDownloader {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            client: reqwest::Client::new(),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Local file name for an image URL
pub fn file_name(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("invalid image url {}", url))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("image url {} has no file name", url))
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<PathBuf> {
        let path = self.dir.join(file_name(url)?);

        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(path)
    }
}

/// Generates images and saves them locally, returning the saved paths.
pub struct ImageCapability {
    descriptor: CapabilityDescriptor,
    generator: Arc<dyn ImageGenerator>,
    downloader: Arc<dyn Downloader>,
}

impl ImageCapability {
    pub fn new(generator: Arc<dyn ImageGenerator>, downloader: Arc<dyn Downloader>) -> Self {
        let descriptor = CapabilityDescriptor::new(
            "create_images",
            "Generates images and returns paths to them",
        )
        .with_parameter(
            "prompt",
            Parameter::string("The prompt to generate images for").required(),
        )
        .with_parameter(
            "number",
            Parameter::integer("Number of images to generate").required(),
        )
        .with_parameter(
            "size",
            Parameter::one_of(
                format!(
                    "Size of the images to generate. Must be one of {}",
                    SIZES.join(", ")
                ),
                SIZES,
            )
            .required(),
        );

        Self {
            descriptor,
            generator,
            downloader,
        }
    }
}

#[async_trait]
impl Capability for ImageCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn call(&self, ctx: &Context, args: Arguments) -> CapabilityResult<Value> {
        let prompt = args.string("prompt")?;
        let number = args.integer("number")?;
        let size = args.string("size")?;

        let number = u32::try_from(number)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                CapabilityError::InvalidParameters("'number' must be a positive integer".into())
            })?;
        if !SIZES.contains(&size) {
            return Err(CapabilityError::InvalidParameters(format!(
                "'size' must be one of {}",
                SIZES.join(", ")
            )));
        }

        let urls = ctx
            .run_until_cancelled(self.generator.generate(prompt, number, size))
            .await
            .ok_or(CapabilityError::Cancelled)?
            .map_err(|e| {
                CapabilityError::ExecutionError(format!("failed to generate images: {}", e))
            })?;
        debug!(count = urls.len(), "generated images");

        let mut paths = Vec::new();
        for url in urls {
            let saved = ctx
                .run_until_cancelled(self.downloader.download(&url))
                .await
                .ok_or(CapabilityError::Cancelled)?;
            match saved {
                Ok(path) => paths.push(path.display().to_string()),
                Err(e) => error!(url = %url, error = %e, "failed to download image"),
            }
        }

        Ok(json!(paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedGenerator {
        urls: Vec<String>,
        requests: Mutex<Vec<(String, u32, String)>>,
    }

    impl FixedGenerator {
        fn new(urls: &[&str]) -> Self {
            Self {
                urls: urls.iter().map(|u| u.to_string()).collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for FixedGenerator {
        async fn generate(&self, prompt: &str, number: u32, size: &str) -> Result<Vec<String>> {
            self.requests
                .lock()
                .unwrap()
                .push((prompt.to_string(), number, size.to_string()));
            Ok(self.urls.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ImageGenerator for FailingGenerator {
        async fn generate(&self, _: &str, _: u32, _: &str) -> Result<Vec<String>> {
            Err(anyhow!("quota exceeded"))
        }
    }

    /// Fails every URL containing "broken"
    struct FlakyDownloader;

    #[async_trait]
    impl Downloader for FlakyDownloader {
        async fn download(&self, url: &str) -> Result<PathBuf> {
            if url.contains("broken") {
                return Err(anyhow!("connection reset"));
            }
            Ok(PathBuf::from(file_name(url)?))
        }
    }

    fn args(value: Value) -> Arguments {
        Arguments::decode(&value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_failed_download_is_skipped() {
        let generator = Arc::new(FixedGenerator::new(&[
            "https://images.example.com/a/cat.png",
            "https://images.example.com/broken/dog.png",
        ]));
        let capability = ImageCapability::new(generator.clone(), Arc::new(FlakyDownloader));

        let out = capability
            .call(
                &Context::new(),
                args(json!({"prompt": "a cat", "number": 2, "size": "256x256"})),
            )
            .await
            .unwrap();

        assert_eq!(out, json!(["cat.png"]));
        assert_eq!(
            *generator.requests.lock().unwrap(),
            vec![("a cat".to_string(), 2, "256x256".to_string())]
        );
    }

    #[tokio::test]
    async fn test_all_downloads_failing_returns_empty_list() {
        let generator = Arc::new(FixedGenerator::new(&["https://x.test/broken/1.png"]));
        let capability = ImageCapability::new(generator, Arc::new(FlakyDownloader));

        let out = capability
            .call(
                &Context::new(),
                args(json!({"prompt": "p", "number": 1, "size": "512x512"})),
            )
            .await
            .unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_generation_failure_is_a_function_error() {
        let capability = ImageCapability::new(Arc::new(FailingGenerator), Arc::new(FlakyDownloader));

        let err = capability
            .call(
                &Context::new(),
                args(json!({"prompt": "p", "number": 1, "size": "256x256"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::ExecutionError(msg) if msg.contains("quota exceeded")));
    }

    #[tokio::test]
    async fn test_rejects_bad_size_and_number() {
        let capability = ImageCapability::new(
            Arc::new(FixedGenerator::new(&[])),
            Arc::new(FlakyDownloader),
        );
        let ctx = Context::new();

        for bad in [
            json!({"prompt": "p", "number": 1, "size": "10x10"}),
            json!({"prompt": "p", "number": 0, "size": "256x256"}),
            json!({"prompt": "p", "number": -2, "size": "256x256"}),
            json!({"number": 1, "size": "256x256"}),
        ] {
            let err = capability.call(&ctx, args(bad)).await.unwrap_err();
            assert!(matches!(err, CapabilityError::InvalidParameters(_)));
        }
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name("https://cdn.test/img/abc.png?sig=1").unwrap(),
            "abc.png"
        );
        assert!(file_name("https://cdn.test/").is_err());
        assert!(file_name("not a url").is_err());
    }

    #[tokio::test]
    async fn test_http_downloader_saves_file() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/images/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir()?;
        let downloader = HttpDownloader::new(dir.path().join("out"));

        let saved = downloader
            .download(&format!("{}/images/cat.png", server.uri()))
            .await?;
        assert_eq!(saved, dir.path().join("out").join("cat.png"));
        assert_eq!(std::fs::read(&saved)?, b"png-bytes");

        assert!(downloader
            .download(&format!("{}/images/gone.png", server.uri()))
            .await
            .is_err());
        Ok(())
    }
}
