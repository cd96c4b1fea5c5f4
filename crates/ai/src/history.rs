//! Storage for the persisted conversation transcript.
//!
//! A [`Backend`] moves raw bytes in and out of storage and a [`Format`] turns those
//! bytes into messages. The history stage combines the two.
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::message::Message;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Read the stored bytes, or `None` if nothing has been stored yet
    async fn read(&self) -> Result<Option<Vec<u8>>>;

    async fn write(&self, bytes: Vec<u8>) -> Result<()>;
}

pub trait Format: Send + Sync {
    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Message>>;
}

/// Transcript kept in a single file
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
        }

        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Transcript kept in memory, mostly useful for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryBackend {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes)),
        }
    }

    /// Snapshot of what has been written so far
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.bytes())
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<()> {
        *self.bytes.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes);
        Ok(())
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn read(&self) -> Result<Option<Vec<u8>>> {
        (**self).read().await
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<()> {
        (**self).write(bytes).await
    }
}

/// A JSON array of messages
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Format for Json {
    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(messages)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Message>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One JSON message per line
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLines;

impl Format for JsonLines {
    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>> {
        let mut writer = Vec::new();
        for message in messages {
            serde_json::to_writer(&mut writer, message)?;
            writeln!(writer)?;
        }
        Ok(writer)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for (index, line) in BufRead::lines(bytes).enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let message = serde_json::from_str(&line)
                .with_context(|| format!("invalid message on line {}", index + 1))?;
            messages.push(message);
        }
        Ok(messages)
    }
}
