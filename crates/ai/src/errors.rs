use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a whole invocation and are surfaced to the caller.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("no stages configured")]
    NoStages,

    #[error("reached the end of the pipeline without a response")]
    EndOfPipeline,

    #[error("failed to read history: {0}")]
    ReadHistory(#[source] anyhow::Error),

    #[error("failed to decode history: {0}")]
    DecodeHistory(#[source] anyhow::Error),

    #[error("backend request failed: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("too many function calls (limit is {0})")]
    TooManyFunctionCalls(usize),

    #[error("capability '{0}' is advertised but not registered")]
    UnregisteredCapability(String),

    #[error("capability '{0}' is already registered")]
    DuplicateCapability(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Errors produced while resolving or running a capability. These are fed
/// back to the backend as function results instead of failing the call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum CapabilityError {
    #[error("function not found: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidParameters(String),

    #[error("execution failed: {0}")]
    ExecutionError(String),

    #[error("cancelled")]
    Cancelled,
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;
